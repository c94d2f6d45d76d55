//! # stratus_core
//!
//! The decision orchestrator. It takes a natural-language request and,
//! optionally, a caller-supplied infrastructure description, and returns generated
//! code together with an admit/block verdict.
//!
//! ## Flow
//!
//! 1. Extract (bounded by a timeout) or take the override, then normalize
//! 2. Generate Terraform and the hardening playbook
//! 3. Scan the phrase for dangerous intent
//! 4. Audit each provider section and aggregate the reports
//! 5. Block when anything dangerous was asked for or the score is below the threshold
//!
//! Extraction failures and timeouts fall back to a minimal single-server AWS
//! description instead of failing the request.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stratus_core::{Orchestrator, StratusConfig};
//!
//! # async fn example() -> stratus_core::CoreResult<()> {
//! let orchestrator = Orchestrator::from_config(StratusConfig::load(None)?);
//! let outcome = orchestrator.process("Je veux 2 serveurs AWS", None).await?;
//! println!("{} {}", outcome.status, outcome.report.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod verdict;

pub use config::{ExtractionConfig, HistoryConfig, StratusConfig, VerdictConfig, DEFAULT_CONFIG_FILE};
pub use error::{CoreError, CoreResult};
pub use history::{RunHistory, RunRecord};
pub use orchestrator::{InfraSource, Orchestrator, ProcessOutcome};
pub use verdict::{decide, BlockReason, Verdict, BLOCKED_MARKER};
