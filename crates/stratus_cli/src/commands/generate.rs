//! Generate command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use stratus_core::{InfraSource, Orchestrator, ProcessOutcome, StratusConfig};
use stratus_extract::ExtractionMode;
use stratus_iac::BundleWriter;
use stratus_model::RawInfrastructure;
use tracing::info;

use super::{Blocked, OutputFormat};

#[derive(Args)]
pub struct GenerateArgs {
    /// Natural-language description of the infrastructure
    pub description: String,

    /// JSON infrastructure description used instead of extraction
    #[arg(long)]
    pub infra: Option<PathBuf>,

    /// Directory to write the bundle to (only when the request is accepted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Configuration file (defaults to ./stratus.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extraction mode: keyword or llm
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<ExtractionMode>,
}

fn parse_mode(value: &str) -> Result<ExtractionMode, String> {
    ExtractionMode::from_str(value).ok_or_else(|| format!("unknown extraction mode '{}' (expected keyword or llm)", value))
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let mut config = StratusConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(mode) = args.mode {
        config = config.with_mode(mode);
    }

    let infra = match &args.infra {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Infrastructure file not found: {}", path.display()))?;
            Some(RawInfrastructure::from_json(&json).context("Invalid infrastructure file")?)
        }
        None => None,
    };

    let orchestrator = Orchestrator::from_config(config);
    info!("Processing request with the {} extractor", orchestrator.extractor_name());

    let outcome = orchestrator
        .process(&args.description, infra.as_ref())
        .await
        .context("Failed to process request")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_outcome(&outcome),
    }

    if !outcome.is_ok() {
        return Err(Blocked::new(outcome.block_reasons.clone()).into());
    }

    if let (Some(dir), Some(artifact)) = (&args.output, &outcome.artifact) {
        let written = BundleWriter::new(dir).write(artifact).context("Failed to write bundle")?;
        if args.format == OutputFormat::Text {
            println!("\n📁 Wrote {} file(s) to {}", written.len(), dir.display());
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ProcessOutcome) {
    println!("🔍 Run {}", outcome.run_id);
    match outcome.source {
        InfraSource::Override => println!("Infrastructure: supplied by caller"),
        InfraSource::Extracted => println!("Infrastructure: extracted from description"),
        InfraSource::Fallback => println!(
            "Infrastructure: default fallback ({})",
            outcome.fallback_reason.as_deref().unwrap_or("unknown reason")
        ),
    }
    for spec in outcome.infrastructure.iter() {
        println!(
            "  - {}: {} server(s), {} database(s) ({}), {} network(s), {} load balancer(s), {} security group(s)",
            spec.provider().display_name(),
            spec.servers(),
            spec.databases(),
            spec.database_type(),
            spec.networks(),
            spec.load_balancers(),
            spec.security_groups()
        );
    }

    if !outcome.dangerous_requests.is_empty() {
        println!("\n⚠️  Insecure requests detected:");
        for req in &outcome.dangerous_requests {
            println!("  - {}: applied {} instead. {}", req.requested, req.applied, req.reason);
        }
    }

    println!();
    if outcome.section_reports.len() > 1 {
        for report in &outcome.section_reports {
            let provider = report.provider.map(|p| p.display_name()).unwrap_or("unknown");
            println!("[{}] {}", provider, report.summary());
        }
    }
    print!("{}", outcome.report.render_text());

    println!();
    if outcome.is_ok() {
        println!("✅ Status: {}", outcome.status);
        println!("\n{}", outcome.provisioning_code);
    } else {
        let reasons = outcome.block_reasons.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ");
        println!("❌ Status: {} ({})", outcome.status, reasons);
        println!("Provisioning code withheld.");
    }
    println!("\n{}", outcome.playbook_code);
}
