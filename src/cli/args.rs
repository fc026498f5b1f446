//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::date_key::DateKey;
use crate::storage::config::ConfigOverrides;

/// Inspect and maintain the local activity cache and credential store.
#[derive(Parser, Debug)]
#[command(name = "actstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Cache root directory
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Config values supplied on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show resolved paths and settings
    Paths,

    /// Show the day index
    Index {
        /// Only this account
        #[arg(long, value_name = "ACCOUNT")]
        account: Option<String>,
    },

    /// Show the merged heatmap
    Heatmap {
        /// Compute from the day index instead of cached heatmaps
        #[arg(long)]
        index_only: bool,
    },

    /// Show the account registry
    Accounts,

    /// Show one cached day of activities
    Day {
        /// Account id
        account: String,

        /// Day as YYYY-MM-DD (UTC)
        #[arg(value_parser = parse_date_key)]
        date: DateKey,
    },

    /// Drop all cached data for an account
    Clear {
        /// Account id
        account: String,
    },

    /// Manage stored credentials
    #[command(subcommand)]
    Tokens(TokensCommand),
}

/// Credential subcommands.
#[derive(Subcommand, Debug)]
pub enum TokensCommand {
    /// List accounts with stored credentials
    List,

    /// Store a credential
    Set {
        /// Logical key, e.g. `gitlab:acme` or `gitlab:acme:refresh`
        key: String,

        /// Token value
        #[arg(long, env = "ACTSTORE_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Delete a credential (the access key removes the whole account)
    Delete {
        /// Logical key
        key: String,
    },
}

fn parse_date_key(s: &str) -> Result<DateKey, String> {
    DateKey::parse(s).ok_or_else(|| format!("'{s}' is not a YYYY-MM-DD date"))
}
