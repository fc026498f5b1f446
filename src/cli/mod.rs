//! CLI argument parsing and command dispatch.

pub mod args;
pub mod inspect;
pub mod tokens;

use serde_json::{Value, json};

pub use args::{Cli, Commands, TokensCommand};

use crate::error::Result;
use crate::storage::{ActivityStore, ResolvedConfig};
use crate::tokens::SecureTokenStore;

/// Schema tag on every JSON document printed to stdout.
pub const SCHEMA_VERSION: &str = "actstore.v1";

/// Run a parsed command against the resolved configuration.
///
/// # Errors
/// Propagates configuration, credential, and output errors.
pub async fn run(command: &Commands, config: &ResolvedConfig) -> Result<()> {
    match command {
        Commands::Paths => inspect::execute_paths(config),
        Commands::Tokens(cmd) => {
            let store = SecureTokenStore::open_keyring(&config.keyring_service)?;
            tokens::execute(&store, cmd).await
        }
        Commands::Index { account } => {
            inspect::execute_index(&open_store(config)?, account.as_deref()).await
        }
        Commands::Heatmap { index_only } => {
            inspect::execute_heatmap(&open_store(config)?, *index_only).await
        }
        Commands::Accounts => inspect::execute_accounts(&open_store(config)?).await,
        Commands::Day { account, date } => {
            inspect::execute_day(&open_store(config)?, account, *date).await
        }
        Commands::Clear { account } => inspect::execute_clear(&open_store(config)?, account).await,
    }
}

fn open_store(config: &ResolvedConfig) -> Result<ActivityStore> {
    ActivityStore::open(&config.store_root, config.policy)
}

/// Print a command result as pretty JSON.
pub(crate) fn emit(command: &str, data: Value) -> Result<()> {
    let output = json!({
        "schemaVersion": SCHEMA_VERSION,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub(crate) fn resolved_paths_json(config: &ResolvedConfig) -> Value {
    json!({
        "configFile": config.config_file,
        "storeRoot": config.store_root,
        "storeRootSource": config.sources.store_root.to_string(),
        "keyringService": config.keyring_service,
        "keyringServiceSource": config.sources.keyring_service.to_string(),
        "todayTtlSecs": config.policy.today_ttl.as_secs(),
        "todayTtlSource": config.sources.today_ttl.to_string(),
    })
}
