//! Policies command implementation.

use anyhow::Result;
use clap::Args;
use stratus_model::CloudProvider;
use stratus_policy::{PolicyRegistry, PolicySummary};

use super::{parse_provider, OutputFormat};

#[derive(Args)]
pub struct PoliciesArgs {
    /// Only show settings for this provider
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn execute(args: PoliciesArgs) -> Result<()> {
    let provider = args.provider.as_deref().map(parse_provider).transpose()?;
    let registry = PolicyRegistry::shared();
    let summaries = summaries(&registry, provider);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Text => {
            println!("📋 {} security policies\n", summaries.len());
            for policy in &summaries {
                println!("{} [{}] {} ({})", policy.id, policy.severity, policy.name, policy.category);
                if !policy.description.is_empty() {
                    println!("    {}", policy.description);
                }
                for setting in &policy.settings {
                    println!(
                        "    {:<10} {:<18} {} = {}",
                        setting.provider.as_str(),
                        setting.target.as_str(),
                        setting.key,
                        setting.value
                    );
                }
            }
        }
    }

    Ok(())
}

/// Registry summaries, with settings narrowed to one provider when given.
fn summaries(registry: &PolicyRegistry, provider: Option<CloudProvider>) -> Vec<PolicySummary> {
    registry
        .list_policies()
        .iter()
        .map(|policy| {
            let mut summary = policy.summary();
            if let Some(p) = provider {
                summary.settings.retain(|s| s.provider == p);
            }
            summary
        })
        .collect()
}
