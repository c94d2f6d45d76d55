//! Error types for the infrastructure model.

use thiserror::Error;

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Validation failures raised while normalizing raw infrastructure input.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Validation failed: {field} must be non-negative (got {value}) in provider entry {index}")]
    NegativeCount {
        index: usize,
        field: &'static str,
        value: i64,
    },

    #[error("Validation failed: {field} = {value} exceeds the maximum of {max} in provider entry {index}")]
    CountOutOfRange {
        index: usize,
        field: &'static str,
        value: i64,
        max: u32,
    },

    #[error("Validation failed: infrastructure request must contain at least one provider")]
    EmptyRequest,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// True for errors caused by the content of the request rather than its encoding.
    pub fn is_validation(&self) -> bool {
        !matches!(self, ModelError::Json(_))
    }
}
