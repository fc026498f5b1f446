//! Day-partitioned activity cache.
//!
//! Each (account, UTC day) is stored in its own file under
//! `activities/{account}/{date}.json`, and every save records a `DayStatus`
//! in the day index. The index entry is written only after the file write
//! succeeds, so an index entry never points at missing data. A file without
//! an index entry only causes a redundant refetch.
//!
//! Past days never expire. Only today's partition can still change, so it is
//! the only one checked for age (`is_today_stale`).

use std::time::Duration;

use chrono::Utc;

use super::gateway::{CacheQueue, Gateway, Ttl, or_absent};
use super::keys::{DAY_INDEX_KEY, day_dir, day_file_path, heatmap_key, key_path};
use crate::core::date_key::DateKey;
use crate::core::models::{DayIndex, DayStatus, UnifiedActivity, sort_newest_first};
use crate::error::Result;

/// Default age after which today's partition is considered stale.
pub const DEFAULT_TODAY_TTL_SECS: u64 = 15 * 60;

/// Handle to the day-partitioned cache.
#[derive(Clone)]
pub struct DayPartitionedActivityCache {
    queue: CacheQueue,
    today_ttl: Duration,
}

impl DayPartitionedActivityCache {
    pub(crate) const fn new(queue: CacheQueue, today_ttl: Duration) -> Self {
        Self { queue, today_ttl }
    }

    /// Overwrite a day's activities and record it in the day index.
    ///
    /// An empty list is stored too: "checked, nothing happened" is distinct
    /// from "never checked".
    pub async fn save_day(&self, account_id: &str, date: DateKey, activities: Vec<UnifiedActivity>) {
        let account_id = account_id.to_string();
        self.queue
            .write("save day", move |gw| save_day(gw, &account_id, date, &activities))
            .await;
    }

    /// A day's activities if its file exists, regardless of age.
    pub async fn load_day(&self, account_id: &str, date: DateKey) -> Option<Vec<UnifiedActivity>> {
        let path = day_file_path(account_id, date);
        self.queue
            .read("load day", move |gw| gw.read(&path, Ttl::Infinite))
            .await
    }

    /// Activities for several days, newest first. Missing days are skipped.
    pub async fn load_days(&self, account_id: &str, dates: &[DateKey]) -> Vec<UnifiedActivity> {
        let account_id = account_id.to_string();
        let dates = dates.to_vec();
        self.queue
            .query("load days", move |gw| load_days(gw, &account_id, &dates))
            .await
            .unwrap_or_default()
    }

    /// Whether the day has been durably fetched. Reads only the day index.
    pub async fn is_day_fetched(&self, account_id: &str, date: DateKey) -> bool {
        let account_id = account_id.to_string();
        self.queue
            .query("check day", move |gw| read_day_index(gw).is_fetched(&account_id, date))
            .await
            .unwrap_or(false)
    }

    /// Whether today's partition is missing or older than the today TTL.
    pub async fn is_today_stale(&self, account_id: &str) -> bool {
        let path = day_file_path(account_id, DateKey::today());
        let ttl = self.today_ttl;
        self.queue
            .query("check today", move |gw| {
                gw.modified_age(&path).is_none_or(|age| age > ttl)
            })
            .await
            .unwrap_or(true)
    }

    /// The full day index. Empty when nothing has been fetched.
    pub async fn get_index(&self) -> DayIndex {
        self.queue
            .query("read day index", read_day_index)
            .await
            .unwrap_or_default()
    }

    /// Record a day's count without writing its activities.
    pub async fn update_index_only(&self, account_id: &str, date: DateKey, count: usize) {
        let account_id = account_id.to_string();
        self.queue
            .write("update day index", move |gw| {
                record_day(gw, &account_id, date, count)
            })
            .await;
    }

    /// Fetched days for an account, ascending.
    pub async fn fetched_dates(&self, account_id: &str) -> Vec<DateKey> {
        self.get_index().await.dates_for(account_id)
    }

    /// The subset of `dates` that needs a fetch: never fetched, or today
    /// when today's partition is stale.
    pub async fn plan_refresh(&self, account_id: &str, dates: &[DateKey]) -> Vec<DateKey> {
        let account_id = account_id.to_string();
        let dates = dates.to_vec();
        let ttl = self.today_ttl;
        self.queue
            .query("plan refresh", move |gw| {
                let index = read_day_index(gw);
                let today = DateKey::today();
                dates
                    .into_iter()
                    .filter(|date| {
                        if !index.is_fetched(&account_id, *date) {
                            return true;
                        }
                        *date == today
                            && gw
                                .modified_age(&day_file_path(&account_id, today))
                                .is_none_or(|age| age > ttl)
                    })
                    .collect()
            })
            .await
            .unwrap_or_default()
    }

    /// Remove the account's day files, index entry, and heatmap cache as one
    /// unit of work.
    pub async fn clear(&self, account_id: &str) {
        let account_id = account_id.to_string();
        self.queue
            .write("clear days", move |gw| clear_days(gw, &account_id))
            .await;
    }
}

/// Current day index; absent or unreadable reads as empty.
pub(crate) fn read_day_index(gw: &Gateway) -> DayIndex {
    or_absent(gw.read(&key_path(DAY_INDEX_KEY), Ttl::Infinite), "read day index")
        .unwrap_or_default()
}

fn save_day(gw: &Gateway, account_id: &str, date: DateKey, activities: &[UnifiedActivity]) -> Result<()> {
    gw.write(&day_file_path(account_id, date), &activities)?;
    record_day(gw, account_id, date, activities.len())
}

fn record_day(gw: &Gateway, account_id: &str, date: DateKey, count: usize) -> Result<()> {
    let mut index = read_day_index(gw);
    index.record(
        account_id,
        date,
        DayStatus {
            fetched_at: Utc::now(),
            count,
        },
    );
    gw.write(&key_path(DAY_INDEX_KEY), &index)?;
    tracing::debug!(account = account_id, date = %date, count, "recorded day");
    Ok(())
}

fn load_days(gw: &Gateway, account_id: &str, dates: &[DateKey]) -> Vec<UnifiedActivity> {
    let mut activities: Vec<UnifiedActivity> = dates
        .iter()
        .filter_map(|date| {
            or_absent(
                gw.read::<Vec<UnifiedActivity>>(&day_file_path(account_id, *date), Ttl::Infinite),
                "load day partition",
            )
        })
        .flatten()
        .collect();
    sort_newest_first(&mut activities);
    activities
}

pub(crate) fn clear_days(gw: &Gateway, account_id: &str) -> Result<()> {
    gw.remove_dir(&day_dir(account_id))?;

    let mut index = read_day_index(gw);
    if index.remove_account(account_id) {
        gw.write(&key_path(DAY_INDEX_KEY), &index)?;
    }

    gw.delete(&key_path(&heatmap_key(account_id)))?;
    tracing::debug!(account = account_id, "cleared day partitions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::test_utils::{backdate_file, make_test_activities, make_test_activity_at};

    fn date(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn cache(tmp: &TempDir) -> DayPartitionedActivityCache {
        let queue = CacheQueue::start(Gateway::new(tmp.path()).unwrap()).unwrap();
        DayPartitionedActivityCache::new(queue, Duration::from_secs(DEFAULT_TODAY_TTL_SECS))
    }

    #[tokio::test]
    async fn test_save_day_round_trip() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let day = date("2025-03-01");
        let activities = make_test_activities("gitlab:acme", "gitlab", day, 3);

        cache.save_day("gitlab:acme", day, activities.clone()).await;

        assert_eq!(cache.load_day("gitlab:acme", day).await, Some(activities));
        assert!(cache.is_day_fetched("gitlab:acme", day).await);
    }

    #[tokio::test]
    async fn test_never_fetched_day() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let day = date("2025-03-01");

        assert!(!cache.is_day_fetched("gitlab:acme", day).await);
        assert!(cache.load_day("gitlab:acme", day).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_day_is_fetched_with_zero_count() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let day = date("2025-03-02");

        cache.save_day("gitlab:acme", day, Vec::new()).await;

        assert_eq!(cache.load_day("gitlab:acme", day).await, Some(Vec::new()));
        let index = cache.get_index().await;
        assert_eq!(index.status("gitlab:acme", day).map(|s| s.count), Some(0));
    }

    #[tokio::test]
    async fn test_past_day_never_expires() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let day = date("2024-01-15");
        cache
            .save_day("gitlab:acme", day, make_test_activities("gitlab:acme", "gitlab", day, 2))
            .await;

        backdate_file(
            &tmp.path().join(day_file_path("gitlab:acme", day)),
            Duration::from_secs(365 * 24 * 3600),
        );

        assert_eq!(cache.load_day("gitlab:acme", day).await.map(|a| a.len()), Some(2));
    }

    #[tokio::test]
    async fn test_index_entry_not_written_when_file_write_fails() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let day = date("2025-03-01");

        // A plain file where the account directory should be makes the
        // partition write fail.
        std::fs::create_dir_all(tmp.path().join("activities")).unwrap();
        std::fs::write(tmp.path().join(day_dir("gitlab:acme")), "blocker").unwrap();

        cache
            .save_day("gitlab:acme", day, make_test_activities("gitlab:acme", "gitlab", day, 1))
            .await;

        assert!(!cache.is_day_fetched("gitlab:acme", day).await);
    }

    #[tokio::test]
    async fn test_load_days_skips_missing_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        cache
            .save_day(
                "gitlab:acme",
                date("2025-03-01"),
                vec![make_test_activity_at("early", "gitlab", "2025-03-01T08:00:00Z")],
            )
            .await;
        cache
            .save_day(
                "gitlab:acme",
                date("2025-03-03"),
                vec![make_test_activity_at("late", "gitlab", "2025-03-03T08:00:00Z")],
            )
            .await;

        let loaded = cache
            .load_days(
                "gitlab:acme",
                &[date("2025-03-01"), date("2025-03-02"), date("2025-03-03")],
            )
            .await;
        let ids: Vec<&str> = loaded.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["late", "early"]);
    }

    #[tokio::test]
    async fn test_today_staleness() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let today = DateKey::today();

        assert!(cache.is_today_stale("gitlab:acme").await);

        cache.save_day("gitlab:acme", today, Vec::new()).await;
        assert!(!cache.is_today_stale("gitlab:acme").await);

        backdate_file(
            &tmp.path().join(day_file_path("gitlab:acme", today)),
            Duration::from_secs(DEFAULT_TODAY_TTL_SECS + 60),
        );
        assert!(cache.is_today_stale("gitlab:acme").await);

        cache.save_day("gitlab:acme", today, Vec::new()).await;
        assert!(!cache.is_today_stale("gitlab:acme").await);
    }

    #[tokio::test]
    async fn test_update_index_only_does_not_write_file() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let day = date("2025-03-04");

        cache.update_index_only("gitlab:acme", day, 9).await;

        assert!(cache.is_day_fetched("gitlab:acme", day).await);
        assert!(cache.load_day("gitlab:acme", day).await.is_none());
        assert_eq!(
            cache.get_index().await.status("gitlab:acme", day).map(|s| s.count),
            Some(9)
        );
    }

    #[tokio::test]
    async fn test_plan_refresh() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let past = date("2025-03-01");
        let missing = date("2025-03-02");
        let today = DateKey::today();

        cache.save_day("gitlab:acme", past, Vec::new()).await;
        cache.save_day("gitlab:acme", today, Vec::new()).await;

        let plan = cache.plan_refresh("gitlab:acme", &[past, missing, today]).await;
        assert_eq!(plan, vec![missing]);

        backdate_file(
            &tmp.path().join(day_file_path("gitlab:acme", today)),
            Duration::from_secs(DEFAULT_TODAY_TTL_SECS * 2),
        );
        let plan = cache.plan_refresh("gitlab:acme", &[past, missing, today]).await;
        assert_eq!(plan, vec![missing, today]);
    }

    #[tokio::test]
    async fn test_clear_leaves_siblings_untouched() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let days = [date("2025-03-01"), date("2025-03-02")];
        for day in days {
            cache
                .save_day("gitlab:acme", day, make_test_activities("gitlab:acme", "gitlab", day, 1))
                .await;
            cache
                .save_day("github:me", day, make_test_activities("github:me", "github", day, 2))
                .await;
        }
        let gw = Gateway::new(tmp.path()).unwrap();
        gw.write(&key_path(&heatmap_key("gitlab:acme")), &Vec::<u8>::new()).unwrap();
        gw.write(&key_path(&heatmap_key("github:me")), &Vec::<u8>::new()).unwrap();

        cache.clear("gitlab:acme").await;

        for day in days {
            assert!(cache.load_day("gitlab:acme", day).await.is_none());
            assert!(!cache.is_day_fetched("gitlab:acme", day).await);
            assert_eq!(cache.load_day("github:me", day).await.map(|a| a.len()), Some(2));
        }
        assert!(!gw.exists(&key_path(&heatmap_key("gitlab:acme"))));
        assert!(gw.exists(&key_path(&heatmap_key("github:me"))));
        assert_eq!(cache.fetched_dates("github:me").await, days.to_vec());
    }
}
