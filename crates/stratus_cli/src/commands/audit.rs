//! Audit command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use stratus_core::{decide, BlockReason, Verdict};
use stratus_policy::{ComplianceReport, ComplianceValidator, DangerousRequest};

use super::{parse_provider, Blocked, OutputFormat};

#[derive(Args)]
pub struct AuditArgs {
    /// Terraform file to audit
    pub file: PathBuf,

    /// Provider to audit against (detected from the code when omitted)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Request phrase to scan for insecure asks
    #[arg(short, long)]
    pub description: Option<String>,

    /// Minimum score for the code to be accepted
    #[arg(long, default_value_t = 70)]
    pub threshold: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct AuditOutput<'a> {
    status: Verdict,
    block_reasons: &'a [BlockReason],
    dangerous_requests: &'a [DangerousRequest],
    report: &'a ComplianceReport,
}

pub async fn execute(args: AuditArgs) -> Result<()> {
    let provider = args.provider.as_deref().map(parse_provider).transpose()?;
    let code = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Terraform file not found: {}", args.file.display()))?;

    let validator = ComplianceValidator::default();
    let outcome = validator
        .validate(args.description.as_deref().unwrap_or_default(), &code, provider)
        .context("Failed to audit code")?;
    let (status, reasons) = decide(&outcome.dangerous_requests, &outcome.report, args.threshold);

    match args.format {
        OutputFormat::Json => {
            let output = AuditOutput {
                status,
                block_reasons: &reasons,
                dangerous_requests: &outcome.dangerous_requests,
                report: &outcome.report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("🔍 Auditing {}", args.file.display());
            for req in &outcome.dangerous_requests {
                println!("⚠️  {}: {}", req.requested, req.reason);
            }
            print!("{}", outcome.report.render_text());
            if status.is_ok() {
                println!("✅ Status: {}", status);
            } else {
                println!("❌ Status: {}", status);
            }
        }
    }

    if status.is_ok() {
        Ok(())
    } else {
        Err(Blocked::new(reasons).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDCODED: &str = r#"provider "aws" {
  region = "us-east-1"
}

resource "aws_db_instance" "db_1" {
  engine              = "mysql"
  password            = "hunter2"
  publicly_accessible = true
}
"#;

    fn args(file: PathBuf, threshold: u8) -> AuditArgs {
        AuditArgs {
            file,
            provider: None,
            description: None,
            threshold,
            format: OutputFormat::Json,
        }
    }

    #[tokio::test]
    async fn test_insecure_code_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.tf");
        std::fs::write(&file, HARDCODED).unwrap();

        let err = execute(args(file, 70)).await.unwrap_err();
        let blocked = err.downcast_ref::<Blocked>().unwrap();
        assert_eq!(blocked.reasons, vec![BlockReason::ScoreBelowThreshold]);
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let err = execute(args(PathBuf::from("/nonexistent/main.tf"), 70)).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.tf");
        std::fs::write(&file, HARDCODED).unwrap();

        let mut a = args(file, 70);
        a.provider = Some("ibm".to_string());
        assert!(execute(a).await.unwrap_err().to_string().contains("Invalid argument"));
    }
}
