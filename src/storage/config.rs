//! Configuration file loading and resolution.
//!
//! Loads configuration from `config.toml` in the platform config directory
//! (e.g. `~/.config/activity-store/config.toml` on Linux).
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `ACTSTORE_CONFIG`: Override config file path
//! - `ACTSTORE_CACHE_DIR`: Cache root directory
//! - `ACTSTORE_KEYRING_SERVICE`: Secure-storage service name
//! - `ACTSTORE_TODAY_TTL_SECS`: Staleness threshold for today's partition

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use super::day_cache::DEFAULT_TODAY_TTL_SECS;
use super::gateway::Ttl;
use super::heatmap::DEFAULT_HEATMAP_TTL_SECS;
use super::range_cache::DEFAULT_RANGE_TTL_SECS;
use super::store::CachePolicy;
use crate::error::{Result, StoreError};
use crate::tokens::DEFAULT_KEYRING_SERVICE;

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "ACTSTORE_CONFIG";
/// Environment variable for the cache root.
pub const ENV_CACHE_DIR: &str = "ACTSTORE_CACHE_DIR";
/// Environment variable for the secure-storage service name.
pub const ENV_KEYRING_SERVICE: &str = "ACTSTORE_KEYRING_SERVICE";
/// Environment variable for today's staleness threshold in seconds.
pub const ENV_TODAY_TTL_SECS: &str = "ACTSTORE_TODAY_TTL_SECS";

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Config file that was consulted (it may not exist).
    pub config_file: PathBuf,
    /// Root directory of the file caches.
    pub store_root: PathBuf,
    /// Freshness policy.
    pub policy: CachePolicy,
    /// Secure-storage service name.
    pub keyring_service: String,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub store_root: ConfigSource,
    pub today_ttl: ConfigSource,
    pub keyring_service: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration from CLI overrides, the process environment,
    /// and the config file.
    ///
    /// # Errors
    /// Returns an error if the config file exists but is invalid, or any
    /// resolved value is invalid.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with_env(overrides, &AppPaths::new(), |name| std::env::var(name).ok())
    }

    /// Resolution with an injectable environment lookup.
    ///
    /// # Errors
    /// See [`ResolvedConfig::resolve`].
    pub fn resolve_with_env<F>(overrides: &ConfigOverrides, paths: &AppPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = overrides
            .config_file
            .clone()
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from))
            .unwrap_or_else(|| paths.config_file());
        let config = Config::load_from(&config_path)?;
        config.validate()?;

        let mut sources = ConfigSources::default();
        let store_root = Self::resolve_store_root(overrides, &config, paths, &env, &mut sources.store_root);
        let today_ttl = Self::resolve_today_ttl(&config, &env, &mut sources.today_ttl)?;
        let keyring_service = Self::resolve_keyring_service(&config, &env, &mut sources.keyring_service);

        Ok(Self {
            config_file: config_path,
            store_root,
            policy: CachePolicy {
                range_ttl: Ttl::from_secs(config.cache.range_ttl_secs),
                heatmap_ttl: Ttl::from_secs(config.cache.heatmap_ttl_secs),
                today_ttl,
            },
            keyring_service,
            sources,
        })
    }

    fn resolve_store_root<F>(
        overrides: &ConfigOverrides,
        config: &Config,
        paths: &AppPaths,
        env: &F,
        source: &mut ConfigSource,
    ) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. CLI flag
        if let Some(dir) = &overrides.cache_dir {
            *source = ConfigSource::Cli;
            return dir.clone();
        }

        // 2. Environment variable
        if let Some(dir) = env(ENV_CACHE_DIR).filter(|v| !v.trim().is_empty()) {
            *source = ConfigSource::Env;
            return PathBuf::from(dir);
        }

        // 3. Config file
        if let Some(dir) = &config.cache.dir {
            *source = ConfigSource::ConfigFile;
            return dir.clone();
        }

        // 4. Default
        *source = ConfigSource::Default;
        paths.store_root()
    }

    fn resolve_today_ttl<F>(config: &Config, env: &F, source: &mut ConfigSource) -> Result<Duration>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = env(ENV_TODAY_TTL_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| StoreError::ConfigInvalid {
                    key: ENV_TODAY_TTL_SECS.to_string(),
                    value: raw.clone(),
                    message: "must be a positive number of seconds".to_string(),
                })?;
            *source = ConfigSource::Env;
            return Ok(Duration::from_secs(secs));
        }

        *source = if config.cache.today_ttl_secs == DEFAULT_TODAY_TTL_SECS {
            ConfigSource::Default
        } else {
            ConfigSource::ConfigFile
        };
        Ok(Duration::from_secs(config.cache.today_ttl_secs))
    }

    fn resolve_keyring_service<F>(config: &Config, env: &F, source: &mut ConfigSource) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(service) = env(ENV_KEYRING_SERVICE).filter(|v| !v.trim().is_empty()) {
            *source = ConfigSource::Env;
            return service;
        }

        *source = if config.credentials.service == DEFAULT_KEYRING_SERVICE {
            ConfigSource::Default
        } else {
            ConfigSource::ConfigFile
        };
        config.credentials.service.clone()
    }
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache settings.
    pub cache: CacheConfig,
    /// Secure credential storage settings.
    pub credentials: CredentialsConfig,
}

/// Cache location and freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory.
    pub dir: Option<PathBuf>,
    /// TTL of legacy range entries.
    pub range_ttl_secs: u64,
    /// TTL of per-account heatmaps.
    pub heatmap_ttl_secs: u64,
    /// Staleness threshold for today's day partition.
    pub today_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            range_ttl_secs: DEFAULT_RANGE_TTL_SECS,
            heatmap_ttl_secs: DEFAULT_HEATMAP_TTL_SECS,
            today_ttl_secs: DEFAULT_TODAY_TTL_SECS,
        }
    }
}

/// Secure credential storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Service name of the secure-storage record.
    pub service: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_KEYRING_SERVICE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error only if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| StoreError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| StoreError::ConfigParse {
            path: path.display().to_string(),
            message: format!("failed to serialize config: {e}"),
        })?;

        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` for a zero TTL or an empty service name.
    pub fn validate(&self) -> Result<()> {
        let ttls = [
            ("cache.range_ttl_secs", self.cache.range_ttl_secs),
            ("cache.heatmap_ttl_secs", self.cache.heatmap_ttl_secs),
            ("cache.today_ttl_secs", self.cache.today_ttl_secs),
        ];
        for (key, value) in ttls {
            if value == 0 {
                return Err(StoreError::ConfigInvalid {
                    key: key.to_string(),
                    value: value.to_string(),
                    message: "TTL must be at least one second".to_string(),
                });
            }
        }

        if self.credentials.service.trim().is_empty() {
            return Err(StoreError::ConfigInvalid {
                key: "credentials.service".to_string(),
                value: self.credentials.service.clone(),
                message: "service name must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
