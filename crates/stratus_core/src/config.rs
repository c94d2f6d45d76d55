//! Runtime configuration.
//!
//! Loaded from an optional YAML file, then overridden by `STRATUS_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratus_extract::ExtractionMode;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "stratus.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StratusConfig {
    pub extraction: ExtractionConfig,
    pub verdict: VerdictConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub mode: ExtractionMode,
    /// Bounded wait for the extractor before falling back.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::Keyword,
            timeout_secs: 15,
            model: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// Scores strictly below this block the request.
    pub block_threshold: u8,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self { block_threshold: 70 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl StratusConfig {
    pub fn from_yaml(yaml: &str) -> CoreResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Without one, `stratus.yaml` in the working
    /// directory is used when present. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };
        let base = match file {
            Some(p) => {
                debug!("Loading configuration from {:?}", p);
                Self::from_file(&p)?
            }
            None => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn with_env_overrides(self) -> CoreResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `STRATUS_*` overrides read through `lookup`.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(mode) = get("STRATUS_AI_MODE") {
            self.extraction.mode = ExtractionMode::from_str(&mode)
                .ok_or_else(|| CoreError::Config(format!("STRATUS_AI_MODE: unknown mode '{}'", mode)))?;
        }
        if let Some(secs) = get("STRATUS_EXTRACT_TIMEOUT_SECS") {
            self.extraction.timeout_secs = parse_env("STRATUS_EXTRACT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(model) = get("STRATUS_LLM_MODEL") {
            self.extraction.model = Some(model);
        }
        if let Some(endpoint) = get("STRATUS_LLM_ENDPOINT") {
            self.extraction.endpoint = Some(endpoint);
        }
        if let Some(threshold) = get("STRATUS_BLOCK_THRESHOLD") {
            self.verdict.block_threshold = parse_env("STRATUS_BLOCK_THRESHOLD", &threshold)?;
        }
        if let Some(capacity) = get("STRATUS_HISTORY_CAPACITY") {
            self.history.capacity = parse_env("STRATUS_HISTORY_CAPACITY", &capacity)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.extraction.timeout_secs == 0 {
            return Err(CoreError::Config("extraction.timeout_secs must be at least 1".to_string()));
        }
        if self.verdict.block_threshold > 100 {
            return Err(CoreError::Config(format!(
                "verdict.block_threshold must be between 0 and 100 (got {})",
                self.verdict.block_threshold
            )));
        }
        if self.history.capacity == 0 {
            return Err(CoreError::Config("history.capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.timeout_secs)
    }

    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.extraction.mode = mode;
        self
    }

    pub fn with_block_threshold(mut self, threshold: u8) -> Self {
        self.verdict.block_threshold = threshold;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.extraction.timeout_secs = secs;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history.capacity = capacity;
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .parse()
        .map_err(|_| CoreError::Config(format!("{}: invalid value '{}'", key, value)))
}
