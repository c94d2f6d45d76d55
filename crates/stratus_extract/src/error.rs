//! Error types for extraction.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Ways an extractor can fail to produce a description.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("LLM not configured. Set OPENAI_API_KEY")]
    NotConfigured,

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("Could not parse extraction output: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExtractError {
    /// Transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractError::Http(_) => true,
            ExtractError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
