//! Error types for activity-store.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! - **Credential**: secure-storage rejections. These are always surfaced,
//!   because silently losing a credential must turn into re-authentication.
//! - **Storage**: encoding/decoding and filesystem failures. The file caches
//!   never hand these to callers; they are collapsed into "absent" at the
//!   store facade.
//! - **Configuration**: config file parsing and validation.
//! - **Internal**: worker shutdown and unclassified failures.
//!
//! "Not found" is never an error anywhere in this crate. It is threaded
//! through as `None`.
//!
//! Each error has a stable error code (e.g., `ACTS-K001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Secure credential storage failures.
    Credential,
    /// Cache encoding, decoding, and filesystem failures.
    Storage,
    /// Configuration issues (parse errors, invalid values).
    Configuration,
    /// Internal errors (worker shutdown, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Credential => "Credential storage error",
            Self::Storage => "Cache storage error",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Credential => "K",
            Self::Storage => "S",
            Self::Configuration => "C",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the `actstore` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Secure storage rejected the request; re-authentication is needed
    AuthRequired = 2,
    /// Invalid configuration or arguments
    ConfigError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for activity-store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    // ==========================================================================
    // Credential errors (Category: Credential)
    // ==========================================================================
    /// Platform secure storage rejected an operation.
    #[error("secure storage error (status {status}): {message}")]
    Platform { status: i32, message: String },

    /// A logical credential key could not be parsed.
    #[error("invalid token key: {0}")]
    InvalidTokenKey(String),

    // ==========================================================================
    // Storage errors (Category: Storage)
    // ==========================================================================
    /// A value could not be serialized for storage.
    #[error("failed to encode {key}: {message}")]
    Encoding { key: String, message: String },

    /// A stored value could not be deserialized.
    #[error("failed to decode {key}: {message}")]
    Decoding { key: String, message: String },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed outside the cache paths.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// The serial worker could not run or finish a job.
    #[error("store worker stopped")]
    WorkerStopped,

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Platform { .. } => ExitCode::AuthRequired,
            Self::InvalidTokenKey(_) | Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => {
                ExitCode::ConfigError
            }
            Self::Encoding { .. }
            | Self::Decoding { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::WorkerStopped
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Platform { .. } | Self::InvalidTokenKey(_) => ErrorCategory::Credential,
            Self::Encoding { .. } | Self::Decoding { .. } | Self::Io(_) | Self::Json(_) => {
                ErrorCategory::Storage
            }
            Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => ErrorCategory::Configuration,
            Self::WorkerStopped | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `ACTS-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Platform { .. } => "ACTS-K001",
            Self::InvalidTokenKey(_) => "ACTS-K002",
            Self::Encoding { .. } => "ACTS-S001",
            Self::Decoding { .. } => "ACTS-S002",
            Self::Io(_) => "ACTS-S003",
            Self::Json(_) => "ACTS-S004",
            Self::ConfigParse { .. } => "ACTS-C001",
            Self::ConfigInvalid { .. } => "ACTS-C002",
            Self::WorkerStopped => "ACTS-X001",
            Self::Other(_) => "ACTS-X099",
        }
    }

    /// Whether the caller should drop into an auth-required state.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::Platform { .. })
    }

    /// Platform status code carried by a secure-storage failure.
    #[must_use]
    pub const fn platform_status(&self) -> Option<i32> {
        match self {
            Self::Platform { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for activity-store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
