//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use stratus_core::BlockReason;
use stratus_model::CloudProvider;

pub mod audit;
pub mod generate;
pub mod policies;

/// stratus - policy-driven infrastructure-as-code generation
#[derive(Parser)]
#[command(name = "stratus")]
#[command(version, about = "stratus - policy-driven infrastructure-as-code generation")]
#[command(long_about = r#"
stratus turns a natural-language infrastructure request into Terraform and an
Ansible hardening playbook, audits the result against its security policies and
blocks anything that asks for, or scores as, an insecure configuration.

COMMANDS:
  generate  → Extract, generate, audit and decide
  audit     → Audit existing Terraform code
  policies  → List the security policies and their per-provider settings

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure or blocked request
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate infrastructure code from a description
    Generate(generate::GenerateArgs),

    /// Audit Terraform code against the security policies
    Audit(audit::AuditArgs),

    /// List the registered security policies
    Policies(policies::PoliciesArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// The request was refused; reported with the validation exit code.
#[derive(Debug, thiserror::Error)]
#[error("Request blocked by security policy: {}", format_reasons(.reasons))]
pub struct Blocked {
    pub reasons: Vec<BlockReason>,
}

impl Blocked {
    pub fn new(reasons: Vec<BlockReason>) -> Self {
        Self { reasons }
    }
}

fn format_reasons(reasons: &[BlockReason]) -> String {
    reasons.iter().map(BlockReason::as_str).collect::<Vec<_>>().join(", ")
}

/// Parse a `--provider` value strictly; the CLI does not fall back to AWS.
pub fn parse_provider(value: &str) -> anyhow::Result<CloudProvider> {
    CloudProvider::from_str(value).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid argument --provider: unknown provider '{}' (expected one of: {})",
            value,
            CloudProvider::all().iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
        )
    })
}
