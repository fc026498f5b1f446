//! Legacy range-keyed activity cache.
//!
//! Activities are stored per (account, date window) with a side index of the
//! keys each account has written. Overlapping windows are stored separately,
//! so this path refetches more than the day-partitioned cache does.
//!
//! Expired entries are purged when their own key is read, but stay listed in
//! the range index until the account is cleared.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::gateway::{CacheQueue, Gateway, Ttl, or_absent};
use super::keys::{RANGE_INDEX_KEY, key_path, range_key};
use crate::core::models::{UnifiedActivity, sort_newest_first};
use crate::error::Result;

/// Default freshness of a range entry.
pub const DEFAULT_RANGE_TTL_SECS: u64 = 3600;

/// Range cache keys written per account, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl RangeIndex {
    /// Append `key` for `account_id` unless already listed.
    /// Returns whether the index changed.
    pub fn add(&mut self, account_id: &str, key: &str) -> bool {
        let keys = self.entries.entry(account_id.to_string()).or_default();
        if keys.iter().any(|k| k == key) {
            false
        } else {
            keys.push(key.to_string());
            true
        }
    }

    #[must_use]
    pub fn keys_for(&self, account_id: &str) -> &[String] {
        self.entries.get(account_id).map_or(&[], Vec::as_slice)
    }

    pub fn remove(&mut self, account_id: &str) -> Option<Vec<String>> {
        self.entries.remove(account_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(a, k)| (a.as_str(), k.as_slice()))
    }
}

/// Handle to the legacy range cache.
#[derive(Clone)]
pub struct RangeActivityCache {
    queue: CacheQueue,
    ttl: Ttl,
}

impl RangeActivityCache {
    pub(crate) const fn new(queue: CacheQueue, ttl: Ttl) -> Self {
        Self { queue, ttl }
    }

    /// Store activities for a window and record its key in the range index.
    pub async fn save(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        activities: Vec<UnifiedActivity>,
    ) {
        let account_id = account_id.to_string();
        self.queue
            .write("save range", move |gw| {
                save_range(gw, &account_id, from, to, &activities)
            })
            .await;
    }

    /// Cached activities for a window, or `None` when missing or expired.
    pub async fn load(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Option<Vec<UnifiedActivity>> {
        let key = range_key(account_id, from, to);
        let ttl = self.ttl;
        self.queue
            .read("load range", move |gw| gw.read(&key_path(&key), ttl))
            .await
    }

    /// Every account's cached activities, newest first.
    ///
    /// Expired windows are skipped. An account with no fresh window is
    /// omitted; one whose fresh windows are all empty maps to an empty list.
    pub async fn load_all(&self) -> BTreeMap<String, Vec<UnifiedActivity>> {
        let ttl = self.ttl;
        self.queue
            .query("load all ranges", move |gw| load_all_ranges(gw, ttl))
            .await
            .unwrap_or_default()
    }

    /// Delete every window the account has cached and drop it from the index.
    pub async fn clear(&self, account_id: &str) {
        let account_id = account_id.to_string();
        self.queue
            .write("clear ranges", move |gw| clear_ranges(gw, &account_id))
            .await;
    }
}

pub(crate) fn read_range_index(gw: &Gateway) -> RangeIndex {
    or_absent(
        gw.read(&key_path(RANGE_INDEX_KEY), Ttl::Infinite),
        "read range index",
    )
    .unwrap_or_default()
}

fn save_range(
    gw: &Gateway,
    account_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    activities: &[UnifiedActivity],
) -> Result<()> {
    let key = range_key(account_id, from, to);
    gw.write(&key_path(&key), &activities)?;

    let mut index = read_range_index(gw);
    if index.add(account_id, &key) {
        gw.write(&key_path(RANGE_INDEX_KEY), &index)?;
    }
    tracing::debug!(account = account_id, key = %key, count = activities.len(), "saved range");
    Ok(())
}

fn load_all_ranges(gw: &Gateway, ttl: Ttl) -> BTreeMap<String, Vec<UnifiedActivity>> {
    let index = read_range_index(gw);
    let mut result = BTreeMap::new();

    for (account_id, keys) in index.iter() {
        let windows: Vec<Vec<UnifiedActivity>> = keys
            .iter()
            .filter_map(|key| {
                or_absent(
                    gw.read::<Vec<UnifiedActivity>>(&key_path(key), ttl),
                    "load range entry",
                )
            })
            .collect();
        if windows.is_empty() {
            continue;
        }
        let mut activities: Vec<UnifiedActivity> = windows.into_iter().flatten().collect();
        sort_newest_first(&mut activities);
        result.insert(account_id.to_string(), activities);
    }
    result
}

pub(crate) fn clear_ranges(gw: &Gateway, account_id: &str) -> Result<()> {
    let mut index = read_range_index(gw);
    let Some(keys) = index.remove(account_id) else {
        return Ok(());
    };
    for key in &keys {
        gw.delete(&key_path(key))?;
    }
    gw.write(&key_path(RANGE_INDEX_KEY), &index)?;
    tracing::debug!(account = account_id, removed = keys.len(), "cleared ranges");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::test_utils::{backdate_file, make_test_activity_at};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn cache(tmp: &TempDir) -> RangeActivityCache {
        let queue = CacheQueue::start(Gateway::new(tmp.path()).unwrap()).unwrap();
        RangeActivityCache::new(queue, Ttl::from_secs(DEFAULT_RANGE_TTL_SECS))
    }

    #[test]
    fn test_range_index_add_dedupes() {
        let mut index = RangeIndex::default();
        assert!(index.add("a", "k1"));
        assert!(!index.add("a", "k1"));
        assert!(index.add("a", "k2"));
        assert_eq!(index.keys_for("a"), ["k1", "k2"]);
        assert!(index.keys_for("b").is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let (from, to) = (at("2025-03-01T00:00:00Z"), at("2025-03-07T23:00:00Z"));
        let activities = vec![make_test_activity_at("a1", "gitlab", "2025-03-02T10:00:00Z")];

        cache.save("gitlab:acme", from, to, activities.clone()).await;
        assert_eq!(cache.load("gitlab:acme", from, to).await, Some(activities));
        assert!(cache.load("gitlab:other", from, to).await.is_none());
    }

    #[tokio::test]
    async fn test_saving_same_window_twice_indexes_once() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let (from, to) = (at("2025-03-01T00:00:00Z"), at("2025-03-07T00:00:00Z"));

        cache.save("gitlab:acme", from, to, Vec::new()).await;
        cache.save("gitlab:acme", from, to, Vec::new()).await;

        let gw = Gateway::new(tmp.path()).unwrap();
        assert_eq!(read_range_index(&gw).keys_for("gitlab:acme").len(), 1);
    }

    #[tokio::test]
    async fn test_expired_range_is_purged_but_stays_indexed() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let (from, to) = (at("2025-03-01T00:00:00Z"), at("2025-03-07T00:00:00Z"));
        cache
            .save("gitlab:acme", from, to, vec![make_test_activity_at("a1", "gitlab", "2025-03-02T10:00:00Z")])
            .await;

        let key = range_key("gitlab:acme", from, to);
        let file = tmp.path().join(key_path(&key));
        backdate_file(&file, Duration::from_secs(DEFAULT_RANGE_TTL_SECS + 60));

        assert!(cache.load("gitlab:acme", from, to).await.is_none());
        assert!(!file.exists());

        let gw = Gateway::new(tmp.path()).unwrap();
        assert_eq!(read_range_index(&gw).keys_for("gitlab:acme"), [key]);
    }

    #[tokio::test]
    async fn test_load_all_concatenates_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);

        cache
            .save(
                "gitlab:acme",
                at("2025-03-01T00:00:00Z"),
                at("2025-03-02T00:00:00Z"),
                vec![make_test_activity_at("old", "gitlab", "2025-03-01T09:00:00Z")],
            )
            .await;
        cache
            .save(
                "gitlab:acme",
                at("2025-03-03T00:00:00Z"),
                at("2025-03-04T00:00:00Z"),
                vec![make_test_activity_at("new", "gitlab", "2025-03-03T09:00:00Z")],
            )
            .await;
        cache
            .save(
                "github:me",
                at("2025-03-01T00:00:00Z"),
                at("2025-03-02T00:00:00Z"),
                vec![make_test_activity_at("gh", "github", "2025-03-01T12:00:00Z")],
            )
            .await;

        let all = cache.load_all().await;
        assert_eq!(all.len(), 2);
        let ids: Vec<&str> = all["gitlab:acme"].iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(all["github:me"].len(), 1);
    }

    #[tokio::test]
    async fn test_load_all_skips_expired_windows() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let (from, to) = (at("2025-03-01T00:00:00Z"), at("2025-03-02T00:00:00Z"));
        cache
            .save("gitlab:acme", from, to, vec![make_test_activity_at("a", "gitlab", "2025-03-01T09:00:00Z")])
            .await;
        backdate_file(
            &tmp.path().join(key_path(&range_key("gitlab:acme", from, to))),
            Duration::from_secs(2 * DEFAULT_RANGE_TTL_SECS),
        );

        assert!(cache.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_keeps_account_with_empty_windows() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let (from, to) = (at("2025-03-01T00:00:00Z"), at("2025-03-02T00:00:00Z"));
        cache.save("gitlab:quiet", from, to, Vec::new()).await;

        let all = cache.load_all().await;
        assert_eq!(all.len(), 1);
        assert!(all["gitlab:quiet"].is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_files_and_index_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let (from, to) = (at("2025-03-01T00:00:00Z"), at("2025-03-02T00:00:00Z"));
        cache.save("gitlab:acme", from, to, Vec::new()).await;
        cache.save("github:me", from, to, Vec::new()).await;

        cache.clear("gitlab:acme").await;

        assert!(!tmp.path().join(key_path(&range_key("gitlab:acme", from, to))).exists());
        assert!(cache.load("github:me", from, to).await.is_some());
        let gw = Gateway::new(tmp.path()).unwrap();
        let index = read_range_index(&gw);
        assert!(index.keys_for("gitlab:acme").is_empty());
        assert_eq!(index.keys_for("github:me").len(), 1);
    }
}
