//! Error types for IaC generation.

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while generating or writing a bundle.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Playbook serialization failed: {0}")]
    Playbook(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bundle is empty: no sections to write")]
    EmptyBundle,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
