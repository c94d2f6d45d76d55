//! Error types for policy module.

use thiserror::Error;

/// Result type alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that can occur during policy operations.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Rule evaluation failed: {rule} - {message}")]
    RuleEvaluationFailed { rule: String, message: String },

    #[error("Malformed code at line {line}: {reason}")]
    MalformedCode { line: usize, reason: String },

    #[error("Duplicate policy id: {0}")]
    DuplicatePolicy(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
