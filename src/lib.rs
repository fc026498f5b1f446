//! activity-store - local persistence for an activity aggregator
//!
//! File-backed caches for normalized activity records (whole-range and
//! day-partitioned), per-account heatmaps, and the account registry, plus a
//! credential store that batches every account's tokens into one secure
//! record.

// Note: deny (not forbid) so individual test helpers can opt out if needed
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod storage;
pub mod tokens;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, Result, StoreError};
pub use storage::{ActivityStore, CachePolicy};
pub use tokens::SecureTokenStore;
