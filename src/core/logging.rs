//! Diagnostic logging to stderr or a file.
//!
//! Logging is configured once per process. Token values never reach a log
//! event; the token store only logs keys and status codes.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::Result;

pub const LOG_LEVEL_ENV: &str = "ACTSTORE_LOG";
pub const LOG_FORMAT_ENV: &str = "ACTSTORE_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "ACTSTORE_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Human,
    /// JSON logs (one event per line).
    Json,
    /// Compact logs (single line, terse).
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" | "pretty" => Some(Self::Human),
            "json" | "jsonl" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "verbose" | "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "critical" => Some(Self::Error),
            _ => None,
        }
    }

    /// Convert to tracing filter string.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Effective logging settings after merging CLI flags and the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Merge CLI values over environment values.
    ///
    /// `--verbose` raises the default level to debug but never overrides an
    /// explicit level.
    #[must_use]
    pub fn resolve<F>(
        cli_level: Option<LogLevel>,
        json_output: bool,
        verbose: bool,
        env: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let level = cli_level
            .or_else(|| non_empty(LOG_LEVEL_ENV).and_then(|v| LogLevel::from_arg(&v)))
            .unwrap_or(if verbose {
                LogLevel::Debug
            } else {
                LogLevel::default()
            });

        let format = if json_output {
            LogFormat::Json
        } else {
            non_empty(LOG_FORMAT_ENV)
                .and_then(|v| LogFormat::from_arg(&v))
                .unwrap_or_default()
        };

        let file = non_empty(LOG_FILE_ENV).map(|v| PathBuf::from(v.trim()));

        Self {
            level,
            format,
            file,
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// # Errors
/// Returns `Other` if the configured log file cannot be opened.
pub fn init(settings: &LogSettings) -> Result<()> {
    let writer = match &settings.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let filter = EnvFilter::new(format!("activity_store={}", settings.level.as_filter()));

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_writer(writer)
                .with_target(true)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(false)
                .without_time()
                .try_init()
                .ok();
        }
    }
    Ok(())
}
