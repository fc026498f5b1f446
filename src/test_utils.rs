//! Test utilities for activity-store.
//!
//! Provides data factories, filesystem helpers, an in-memory secure storage
//! backend, and assertion macros for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use activity_store::test_utils::*;
//!
//! let day = DateKey::parse("2025-03-01").unwrap();
//! let activities = make_test_activities("gitlab:acme", "gitlab", day, 3);
//! let backend = MemorySecureBackend::new();
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

use crate::core::date_key::DateKey;
use crate::core::models::{Account, UnifiedActivity};
use crate::storage::{ActivityStore, CachePolicy};
use crate::tokens::backend::{BackendError, SecureBackend};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create a test activity at an RFC 3339 instant.
///
/// # Panics
///
/// Panics if `timestamp` is not valid RFC 3339.
#[must_use]
pub fn make_test_activity_at(id: &str, provider: &str, timestamp: &str) -> UnifiedActivity {
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc);
    make_test_activity_with(id, provider, &format!("{provider}:test"), timestamp)
}

/// Create `count` activities for one account, spread across `day` starting
/// at noon UTC one minute apart.
///
/// Ids are `{account_id}-{day}-{n}`.
#[must_use]
pub fn make_test_activities(
    account_id: &str,
    provider: &str,
    day: DateKey,
    count: usize,
) -> Vec<UnifiedActivity> {
    let noon = day
        .date()
        .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default())
        .and_utc();
    (0..count)
        .map(|n| {
            let minutes = i64::try_from(n).unwrap_or(i64::MAX);
            make_test_activity_with(
                &format!("{account_id}-{day}-{n}"),
                provider,
                account_id,
                noon + TimeDelta::minutes(minutes),
            )
        })
        .collect()
}

fn make_test_activity_with(
    id: &str,
    provider: &str,
    account_id: &str,
    timestamp: DateTime<Utc>,
) -> UnifiedActivity {
    UnifiedActivity {
        id: id.to_string(),
        provider: provider.to_string(),
        account_id: account_id.to_string(),
        source_id: format!("src-{id}"),
        kind: "commit".to_string(),
        timestamp,
        title: Some(format!("Activity {id}")),
        summary: None,
        url: Some(format!("https://{provider}.example.com/{id}")),
        author: Some("tester".to_string()),
        extra: BTreeMap::new(),
    }
}

/// Create an enabled test account.
#[must_use]
pub fn make_test_account(id: &str, provider: &str) -> Account {
    Account {
        id: id.to_string(),
        provider: provider.to_string(),
        display_name: Some(format!("Test {id}")),
        host: None,
        enabled: true,
    }
}

// =============================================================================
// Filesystem Helpers
// =============================================================================

/// Set a file's modification time `age` into the past.
///
/// # Panics
///
/// Panics if the file cannot be opened or its mtime cannot be set.
pub fn backdate_file(path: &Path, age: Duration) {
    let mtime = SystemTime::now()
        .checked_sub(age)
        .expect("age within system clock range");
    fs::File::options()
        .write(true)
        .open(path)
        .expect("file to backdate exists")
        .set_modified(mtime)
        .expect("set file mtime");
}

/// An [`ActivityStore`] rooted in its own temporary directory.
///
/// The directory is removed when the value is dropped.
pub struct TestStore {
    dir: tempfile::TempDir,
    pub store: ActivityStore,
}

impl TestStore {
    /// Open a store with the default policy.
    ///
    /// # Panics
    ///
    /// Panics if the directory or the store cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(CachePolicy::default())
    }

    /// Open a store with a custom policy.
    ///
    /// # Panics
    ///
    /// Panics if the directory or the store cannot be created.
    #[must_use]
    pub fn with_policy(policy: CachePolicy) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store = ActivityStore::open(dir.path(), policy).expect("Failed to open store");
        Self { dir, store }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file relative to the root.
    #[must_use]
    pub fn file(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Reopen a second handle on the same directory, as a new process would.
    ///
    /// # Panics
    ///
    /// Panics if the store cannot be opened.
    #[must_use]
    pub fn reopen(&self) -> ActivityStore {
        ActivityStore::open(self.dir.path(), self.store.policy()).expect("Failed to reopen store")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// In-Memory Secure Storage
// =============================================================================

/// Operations recorded by [`MemorySecureBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Get,
    Update,
    Create,
    Delete,
}

#[derive(Debug, Default)]
struct MemoryRecord {
    payload: Option<String>,
    calls: Vec<BackendOp>,
    failures: Vec<(BackendOp, BackendError)>,
}

impl MemoryRecord {
    fn begin(&mut self, op: BackendOp) -> Result<(), BackendError> {
        self.calls.push(op);
        match self.failures.iter().position(|(failing, _)| *failing == op) {
            Some(i) => Err(self.failures.remove(i).1),
            None => Ok(()),
        }
    }
}

/// Secure storage backed by memory, with failure injection and call
/// recording. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemorySecureBackend {
    inner: Arc<Mutex<MemoryRecord>>,
}

impl MemorySecureBackend {
    /// An empty backend (no record).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose record already holds `payload`.
    #[must_use]
    pub fn with_payload(payload: &str) -> Self {
        let backend = Self::new();
        backend.lock().payload = Some(payload.to_string());
        backend
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_once(&self, op: BackendOp, error: BackendError) {
        self.lock().failures.push((op, error));
    }

    /// Current record payload.
    #[must_use]
    pub fn payload(&self) -> Option<String> {
        self.lock().payload.clone()
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendOp> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRecord> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SecureBackend for MemorySecureBackend {
    fn get(&self) -> Result<Option<String>, BackendError> {
        let mut record = self.lock();
        record.begin(BackendOp::Get)?;
        Ok(record.payload.clone())
    }

    fn update(&self, secret: &str) -> Result<(), BackendError> {
        let mut record = self.lock();
        record.begin(BackendOp::Update)?;
        if record.payload.is_none() {
            return Err(BackendError::NotFound);
        }
        record.payload = Some(secret.to_string());
        Ok(())
    }

    fn create(&self, secret: &str) -> Result<(), BackendError> {
        let mut record = self.lock();
        record.begin(BackendOp::Create)?;
        record.payload = Some(secret.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), BackendError> {
        let mut record = self.lock();
        record.begin(BackendOp::Delete)?;
        record.payload.take().map(|_| ()).ok_or(BackendError::NotFound)
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
///
/// # Examples
///
/// ```rust,ignore
/// use activity_store::assert_contains;
///
/// assert_contains!(output, "gitlab:acme");
/// ```
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}
