//! Durable key-addressed JSON storage.
//!
//! # Features
//! - Atomic writes using temp file + rename (readers never see partial content)
//! - Lazy, read-triggered TTL expiry based on file modification time
//! - Sorted-key, pretty-printed JSON on disk
//! - One serial worker per store instance, so index read-modify-write
//!   sequences never interleave
//!
//! Callers of the file caches only ever observe "present" or "absent". The
//! gateway itself returns `Result`; [`or_absent`] and [`or_logged`] are the
//! single place where those errors are deliberately dropped.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::worker::SerialWorker;
use crate::error::{Result, StoreError};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Maximum age of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Entry expires once its file is older than this.
    Finite(Duration),
    /// Entry never expires.
    Infinite,
}

impl Ttl {
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self::Finite(Duration::from_secs(secs))
    }

    /// Whether an entry of the given age is still fresh.
    #[must_use]
    pub fn admits(self, age: Duration) -> bool {
        match self {
            Self::Finite(max_age) => age <= max_age,
            Self::Infinite => true,
        }
    }
}

/// Filesystem-backed store rooted at one directory.
#[derive(Debug, Clone)]
pub struct Gateway {
    root: PathBuf,
}

impl Gateway {
    /// Create a gateway, creating the root directory if needed.
    ///
    /// # Errors
    /// Returns an error if the root directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    /// Serialize `value` and atomically replace the file at `rel`.
    ///
    /// # Errors
    /// Returns an error if encoding fails or the file cannot be written.
    pub fn write<T: Serialize>(&self, rel: &Path, value: &T) -> Result<()> {
        let path = self.resolve(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Round-trip through `Value` so object keys come out sorted.
        let encoded = serde_json::to_value(value)
            .and_then(|v| serde_json::to_vec_pretty(&v))
            .map_err(|e| StoreError::Encoding {
                key: rel.display().to_string(),
                message: e.to_string(),
            })?;

        write_atomic(&path, &encoded)?;
        tracing::trace!(path = %rel.display(), bytes = encoded.len(), "cache write");
        Ok(())
    }

    /// Read the value at `rel` if present and within `ttl`.
    ///
    /// An expired entry is deleted before reporting absence.
    ///
    /// # Errors
    /// Returns an error on I/O failure or if the stored JSON cannot be decoded.
    pub fn read<T: DeserializeOwned>(&self, rel: &Path, ttl: Ttl) -> Result<Option<T>> {
        let path = self.resolve(rel);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let age = age_of(&metadata);
        if !ttl.admits(age) {
            tracing::debug!(path = %rel.display(), age_secs = age.as_secs(), "cache entry expired");
            self.delete(rel)?;
            return Ok(None);
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Decoding {
                key: rel.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Remove the file at `rel`. Missing files are fine.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be removed.
    pub fn delete(&self, rel: &Path) -> Result<()> {
        match fs::remove_file(self.resolve(rel)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Recursively remove the directory at `rel`. Missing directories are fine.
    ///
    /// # Errors
    /// Returns an error if an existing directory cannot be removed.
    pub fn remove_dir(&self, rel: &Path) -> Result<()> {
        match fs::remove_dir_all(self.resolve(rel)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[must_use]
    pub fn exists(&self, rel: &Path) -> bool {
        self.resolve(rel).is_file()
    }

    /// Age of the file at `rel`, if it exists.
    #[must_use]
    pub fn modified_age(&self, rel: &Path) -> Option<Duration> {
        fs::metadata(self.resolve(rel)).ok().map(|m| age_of(&m))
    }

    /// Remove every entry under the root.
    ///
    /// # Errors
    /// Returns an error if the root cannot be cleared or recreated.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// Age from the file's modification time. Future timestamps count as zero.
fn age_of(metadata: &fs::Metadata) -> Duration {
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .unwrap_or(Duration::ZERO)
}

/// Write bytes atomically using temp file + rename.
fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    // Temp file must live in the same directory for the rename to be atomic.
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("cache"),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

// =============================================================================
// Degrade-to-absent helpers
// =============================================================================

/// Collapse a cache read into presence or absence.
pub fn or_absent<T>(result: Result<Option<T>>, operation: &str) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(operation, error = %err, "cache read failed; treating as absent");
            None
        }
    }
}

/// Collapse a cache write into a logged outcome. Returns whether it succeeded.
pub fn or_logged(result: Result<()>, operation: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(operation, error = %err, "cache write failed; entry will be refetched");
            false
        }
    }
}

// =============================================================================
// Serialized access
// =============================================================================

/// Queue handle shared by every cache of one store instance.
#[derive(Clone)]
pub struct CacheQueue {
    worker: SerialWorker<Gateway>,
}

impl CacheQueue {
    /// Start the worker that owns `gateway`.
    ///
    /// # Errors
    /// Returns an error if the worker thread cannot be spawned.
    pub fn start(gateway: Gateway) -> Result<Self> {
        Ok(Self {
            worker: SerialWorker::spawn("activity-cache", gateway)?,
        })
    }

    /// Run a read-style job; any failure reads as absence.
    pub async fn read<T, F>(&self, operation: &'static str, job: F) -> Option<T>
    where
        F: FnOnce(&Gateway) -> Result<Option<T>> + Send + 'static,
        T: Send + 'static,
    {
        let result = self
            .worker
            .exec(move |gateway: &mut Gateway| job(gateway))
            .await
            .and_then(|inner| inner);
        or_absent(result, operation)
    }

    /// Run a write-style job; failures are logged, never returned.
    pub async fn write<F>(&self, operation: &'static str, job: F) -> bool
    where
        F: FnOnce(&Gateway) -> Result<()> + Send + 'static,
    {
        let result = self
            .worker
            .exec(move |gateway: &mut Gateway| job(gateway))
            .await
            .and_then(|inner| inner);
        or_logged(result, operation)
    }

    /// Run an infallible query against the gateway.
    pub async fn query<T, F>(&self, operation: &'static str, job: F) -> Option<T>
    where
        F: FnOnce(&Gateway) -> T + Send + 'static,
        T: Send + 'static,
    {
        let result = self
            .worker
            .exec(move |gateway: &mut Gateway| job(gateway))
            .await
            .map(Some);
        or_absent(result, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    use crate::test_utils::backdate_file;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        value: String,
        count: i32,
    }

    fn sample() -> TestData {
        TestData {
            value: "hello".to_string(),
            count: 42,
        }
    }

    #[test]
    fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("test.json");

        gateway.write(rel, &sample()).unwrap();
        let read: Option<TestData> = gateway.read(rel, Ttl::Infinite).unwrap();
        assert_eq!(read, Some(sample()));
    }

    #[test]
    fn test_write_creates_nested_dirs() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("activities/acct/2025-03-01.json");

        gateway.write(rel, &vec![1, 2, 3]).unwrap();
        assert!(tmp.path().join(rel).is_file());
    }

    #[test]
    fn test_atomic_write_no_temp_file_left() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("atomic.json");

        write_atomic(&path, b"test").unwrap();

        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].as_ref().unwrap().file_name() == "atomic.json");
    }

    #[test]
    fn test_json_is_pretty_with_sorted_keys() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("sorted.json");

        // Struct field order is value, count; the file must be alphabetical.
        gateway.write(rel, &sample()).unwrap();
        let content = fs::read_to_string(tmp.path().join(rel)).unwrap();
        let count_at = content.find("\"count\"").unwrap();
        let value_at = content.find("\"value\"").unwrap();
        assert!(count_at < value_at);
        assert!(content.contains('\n'));
    }

    #[test]
    fn test_read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let read: Option<TestData> = gateway.read(Path::new("nope.json"), Ttl::from_secs(60)).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_read_within_ttl_returns_value() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("fresh.json");

        gateway.write(rel, &sample()).unwrap();
        backdate_file(&tmp.path().join(rel), Duration::from_secs(30));

        let read: Option<TestData> = gateway.read(rel, Ttl::from_secs(60)).unwrap();
        assert_eq!(read, Some(sample()));
    }

    #[test]
    fn test_read_after_ttl_purges_file() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("stale.json");

        gateway.write(rel, &sample()).unwrap();
        backdate_file(&tmp.path().join(rel), Duration::from_secs(120));

        let read: Option<TestData> = gateway.read(rel, Ttl::from_secs(60)).unwrap();
        assert!(read.is_none());
        assert!(!gateway.exists(rel));
    }

    #[test]
    fn test_infinite_ttl_never_expires() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("forever.json");

        gateway.write(rel, &sample()).unwrap();
        backdate_file(&tmp.path().join(rel), Duration::from_secs(400 * 24 * 3600));

        let read: Option<TestData> = gateway.read(rel, Ttl::Infinite).unwrap();
        assert_eq!(read, Some(sample()));
    }

    #[test]
    fn test_read_corrupt_is_decoding_error() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        fs::write(tmp.path().join("bad.json"), "{ not json").unwrap();

        let result: Result<Option<TestData>> = gateway.read(Path::new("bad.json"), Ttl::Infinite);
        assert!(matches!(result, Err(StoreError::Decoding { .. })));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("gone.json");

        gateway.write(rel, &sample()).unwrap();
        gateway.delete(rel).unwrap();
        gateway.delete(rel).unwrap();
        gateway.remove_dir(Path::new("never-existed")).unwrap();
        assert!(!gateway.exists(rel));
    }

    #[test]
    fn test_modified_age() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        let rel = Path::new("aged.json");

        assert!(gateway.modified_age(rel).is_none());
        gateway.write(rel, &sample()).unwrap();
        backdate_file(&tmp.path().join(rel), Duration::from_secs(600));
        let age = gateway.modified_age(rel).unwrap();
        assert!(age >= Duration::from_secs(600));
    }

    #[traced_test]
    #[test]
    fn test_or_absent_logs_and_drops_error() {
        let failed: Result<Option<u32>> = Err(StoreError::Decoding {
            key: "day_index.json".to_string(),
            message: "EOF".to_string(),
        });
        assert_eq!(or_absent(failed, "load day index"), None);
        assert!(logs_contain("treating as absent"));
        assert_eq!(or_absent(Ok(Some(7)), "load"), Some(7));
    }

    #[tokio::test]
    async fn test_queue_read_degrades_corrupt_entry_to_absent() {
        let tmp = TempDir::new().unwrap();
        let gateway = Gateway::new(tmp.path()).unwrap();
        fs::write(tmp.path().join("index.json"), "[[[").unwrap();
        let queue = CacheQueue::start(gateway).unwrap();

        let read: Option<BTreeMap<String, u32>> = queue
            .read("load index", |gw| gw.read(Path::new("index.json"), Ttl::Infinite))
            .await;
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_queue_write_reports_success() {
        let tmp = TempDir::new().unwrap();
        let queue = CacheQueue::start(Gateway::new(tmp.path()).unwrap()).unwrap();

        let ok = queue
            .write("save", |gw| gw.write(Path::new("x.json"), &sample()))
            .await;
        assert!(ok);
        let exists = queue
            .query("exists", |gw| gw.exists(Path::new("x.json")))
            .await;
        assert_eq!(exists, Some(true));
    }
}
