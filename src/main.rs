//! actstore - activity cache inspection CLI
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use activity_store::cli::{self, Cli};
use activity_store::core::logging::{self, LogLevel, LogSettings};
use activity_store::Result;
use activity_store::storage::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = LogSettings::resolve(
        cli.log_level.as_deref().and_then(LogLevel::from_arg),
        cli.json_output,
        cli.verbose,
        |name| std::env::var(name).ok(),
    );

    let result = match logging::init(&settings) {
        Ok(()) => run(&cli).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            eprintln!("error[{}]: {e}", e.error_code());
            if e.requires_reauth() {
                eprintln!("hint: re-authenticate the affected account and try again");
            }
            ExitCode::from(i32::from(e.exit_code()).try_into().unwrap_or(1u8))
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = ResolvedConfig::resolve(&cli.overrides())?;
    tracing::debug!(
        root = %config.store_root.display(),
        source = %config.sources.store_root,
        "resolved configuration"
    );
    cli::run(&cli.command, &config).await
}
