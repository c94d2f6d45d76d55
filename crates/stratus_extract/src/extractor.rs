//! The extraction seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_model::RawInfrastructure;

use crate::error::ExtractResult;

/// Turns a natural-language request into an untrusted infrastructure description.
///
/// Output is validated by the caller; an extractor never normalizes.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn extract(&self, description: &str) -> ExtractResult<RawInfrastructure>;
}

/// Which extractor the orchestrator should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Offline keyword matching.
    #[default]
    #[serde(alias = "mock")]
    Keyword,
    /// OpenAI-compatible chat completions.
    Llm,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Keyword => "keyword",
            ExtractionMode::Llm => "llm",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyword" | "mock" => Some(ExtractionMode::Keyword),
            "llm" | "openai" => Some(ExtractionMode::Llm),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(ExtractionMode::from_str("mock"), Some(ExtractionMode::Keyword));
        assert_eq!(ExtractionMode::from_str(" LLM "), Some(ExtractionMode::Llm));
        assert_eq!(ExtractionMode::from_str("gemini"), None);
    }

    #[test]
    fn test_mode_serde_alias() {
        let mode: ExtractionMode = serde_json::from_str("\"mock\"").unwrap();
        assert_eq!(mode, ExtractionMode::Keyword);
        assert_eq!(serde_json::to_string(&ExtractionMode::Llm).unwrap(), "\"llm\"");
    }
}
