//! Decision orchestrator.
//!
//! Composes extraction, generation and the two validation phases into one
//! admit/block verdict.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use stratus_extract::{ExtractError, ExtractionMode, Extractor, KeywordExtractor, LlmExtractor};
use stratus_iac::{GeneratedArtifact, Generator};
use stratus_model::{InfrastructureRequest, RawInfrastructure};
use stratus_policy::{ComplianceReport, ComplianceValidator, DangerousRequest, PolicyRegistry};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StratusConfig;
use crate::error::{CoreError, CoreResult};
use crate::history::{RunHistory, RunRecord};
use crate::verdict::{decide, BlockReason, Verdict, BLOCKED_MARKER};

/// Where the infrastructure description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfraSource {
    /// Supplied by the caller.
    Override,
    /// Produced by the extractor.
    Extracted,
    /// Minimal default used after extraction failed.
    Fallback,
}

/// Response payload for one processed request.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub run_id: Uuid,
    pub infrastructure: InfrastructureRequest,
    pub source: InfraSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub status: Verdict,
    pub block_reasons: Vec<BlockReason>,
    /// Generated Terraform, or [`BLOCKED_MARKER`] when blocked.
    pub provisioning_code: String,
    pub playbook_code: String,
    pub report: ComplianceReport,
    /// One report per provider section, in request order.
    pub section_reports: Vec<ComplianceReport>,
    pub dangerous_requests: Vec<DangerousRequest>,
    /// Per-section artifact, withheld when blocked.
    #[serde(skip)]
    pub artifact: Option<GeneratedArtifact>,
}

impl ProcessOutcome {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn is_blocked(&self) -> bool {
        !self.is_ok()
    }
}

/// Runs requests end to end and keeps a bounded history of them.
pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
    generator: Generator,
    validator: ComplianceValidator,
    config: StratusConfig,
    history: RunHistory,
}

impl Orchestrator {
    pub fn new(extractor: Arc<dyn Extractor>, config: StratusConfig) -> Self {
        let registry = PolicyRegistry::shared();
        Self {
            extractor,
            generator: Generator::new(registry.clone()),
            validator: ComplianceValidator::new(registry),
            history: RunHistory::new(config.history.capacity),
            config,
        }
    }

    /// Build the extractor the configuration asks for.
    ///
    /// LLM mode without an API key degrades to keyword extraction.
    pub fn from_config(config: StratusConfig) -> Self {
        let extractor: Arc<dyn Extractor> = match config.extraction.mode {
            ExtractionMode::Keyword => Arc::new(KeywordExtractor::new()),
            ExtractionMode::Llm => match LlmExtractor::from_env() {
                Ok(mut llm) => {
                    if let Some(model) = &config.extraction.model {
                        llm = llm.with_model(model.clone());
                    }
                    if let Some(endpoint) = &config.extraction.endpoint {
                        llm = llm.with_endpoint(endpoint.clone());
                    }
                    Arc::new(llm)
                }
                Err(e) => {
                    warn!("{}; using keyword extraction", e);
                    Arc::new(KeywordExtractor::new())
                }
            },
        };
        Self::new(extractor, config)
    }

    /// Use a different policy registry for both generation and validation.
    pub fn with_registry(mut self, registry: Arc<PolicyRegistry>) -> Self {
        self.generator = Generator::new(registry.clone());
        self.validator = ComplianceValidator::new(registry);
        self
    }

    pub fn config(&self) -> &StratusConfig {
        &self.config
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Process a natural-language request, optionally with a caller-supplied
    /// description that bypasses extraction.
    pub async fn process(
        &self,
        description: &str,
        infra_override: Option<&RawInfrastructure>,
    ) -> CoreResult<ProcessOutcome> {
        if description.trim().is_empty() {
            return Err(CoreError::EmptyDescription);
        }

        let (infrastructure, source, fallback_reason) = match infra_override {
            Some(raw) => (InfrastructureRequest::from_raw(raw)?, InfraSource::Override, None),
            None => self.extract(description).await,
        };

        self.evaluate(description, infrastructure, source, fallback_reason)
    }

    /// Extract and normalize, falling back to the minimal default on any failure.
    async fn extract(&self, description: &str) -> (InfrastructureRequest, InfraSource, Option<String>) {
        let timeout = self.config.extraction_timeout();
        debug!("Extracting with {} (timeout {:?})", self.extractor.name(), timeout);

        let failure = match tokio::time::timeout(timeout, self.extractor.extract(description)).await {
            Ok(Ok(raw)) => match InfrastructureRequest::from_raw(&raw) {
                Ok(request) => {
                    info!("Extracted {} provider section(s) with {}", request.len(), self.extractor.name());
                    return (request, InfraSource::Extracted, None);
                }
                Err(e) => format!("extractor output rejected: {}", e),
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => ExtractError::Timeout(timeout).to_string(),
        };

        warn!("Extraction failed ({}), falling back to the default infrastructure", failure);
        (InfrastructureRequest::fallback_default(), InfraSource::Fallback, Some(failure))
    }

    /// Generate, run both validation phases and decide.
    pub fn evaluate(
        &self,
        description: &str,
        infrastructure: InfrastructureRequest,
        source: InfraSource,
        fallback_reason: Option<String>,
    ) -> CoreResult<ProcessOutcome> {
        let artifact = self.generator.render_request(&infrastructure)?;
        let dangerous_requests = self.validator.scan_intent(description)?;

        let section_reports: Vec<ComplianceReport> = artifact
            .sections
            .iter()
            .map(|s| self.validator.audit(&s.provisioning_code, Some(s.provider)))
            .collect();
        let report = ComplianceReport::aggregate(&section_reports);

        let (status, block_reasons) = decide(&dangerous_requests, &report, self.config.verdict.block_threshold);
        let run_id = Uuid::new_v4();

        info!(
            "Run {}: {} (score {}, grade {}, {} dangerous request(s))",
            run_id,
            status,
            report.score,
            report.grade,
            dangerous_requests.len()
        );
        if !block_reasons.is_empty() {
            warn!(
                "Run {} blocked: {}",
                run_id,
                block_reasons.iter().map(BlockReason::as_str).collect::<Vec<_>>().join(", ")
            );
        }

        self.history.record(RunRecord {
            run_id,
            recorded_at: Utc::now(),
            description: description.to_string(),
            status,
            score: report.score,
            grade: report.grade,
            providers: infrastructure.iter().map(|s| s.provider()).collect(),
        });

        let playbook_code = artifact.playbook_code.clone();
        let (provisioning_code, artifact) = if status.is_ok() {
            (artifact.provisioning_code.clone(), Some(artifact))
        } else {
            (BLOCKED_MARKER.to_string(), None)
        };

        Ok(ProcessOutcome {
            run_id,
            infrastructure,
            source,
            fallback_reason,
            status,
            block_reasons,
            provisioning_code,
            playbook_code,
            report,
            section_reports,
            dangerous_requests,
            artifact,
        })
    }
}
