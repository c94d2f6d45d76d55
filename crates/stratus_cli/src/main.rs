//! stratus CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure or blocked request

use std::process::ExitCode;

use clap::Parser;
use stratus_core::CoreError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Blocked, Cli, Commands, LogFormat};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.log_format);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args).await,
        Commands::Audit(args) => commands::audit::execute(args).await,
        Commands::Policies(args) => commands::policies::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Logs go to stderr so generated code on stdout stays clean.
fn init_logging(verbose: bool, quiet: bool, format: LogFormat) {
    let default = if verbose {
        "stratus=debug,info"
    } else if quiet {
        "error"
    } else {
        "stratus=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let (text, json) = match format {
        LogFormat::Text => (Some(fmt::layer().with_target(false).with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    let log_result = tracing_subscriber::registry().with(filter).with(text).with(json).try_init();
    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<Blocked>().is_some() {
        return ExitCodes::VALIDATION_FAILURE;
    }
    if let Some(core) = e.downcast_ref::<CoreError>() {
        if core.is_validation() {
            return ExitCodes::VALIDATION_FAILURE;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("validation") || msg.contains("policy") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::BlockReason;

    #[test]
    fn test_blocked_maps_to_validation_failure() {
        let err = anyhow::Error::new(Blocked::new(vec![BlockReason::DangerousRequest]));
        assert_eq!(categorize_error(&err), ExitCodes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_core_validation_error_through_context() {
        let err = anyhow::Error::new(CoreError::EmptyDescription).context("Failed to process request");
        assert_eq!(categorize_error(&err), ExitCodes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_message_based_categories() {
        assert_eq!(
            categorize_error(&anyhow::anyhow!("Invalid argument --provider: unknown provider 'ibm'")),
            ExitCodes::INVALID_ARGS
        );
        assert_eq!(
            categorize_error(&anyhow::anyhow!("connection reset")),
            ExitCodes::GENERAL_ERROR
        );
    }
}
