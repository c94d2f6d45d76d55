//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while processing a request.
///
/// Extraction failures never appear here: they trigger the fallback description.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Description must not be empty")]
    EmptyDescription,

    #[error("{0}")]
    Model(#[from] stratus_model::ModelError),

    #[error("Generation failed: {0}")]
    Iac(#[from] stratus_iac::IacError),

    #[error("Policy evaluation failed: {0}")]
    Policy(#[from] stratus_policy::PolicyError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// True when the caller sent something unusable, as opposed to an internal failure.
    pub fn is_validation(&self) -> bool {
        match self {
            CoreError::EmptyDescription => true,
            CoreError::Model(e) => e.is_validation(),
            _ => false,
        }
    }
}
