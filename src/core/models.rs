//! Data models shared by the caches.
//!
//! Activities and accounts come from the fetch/normalization layer and are
//! stored opaquely; only `timestamp` and `provider` are ever inspected here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::date_key::DateKey;

// =============================================================================
// Activities and accounts
// =============================================================================

/// A normalized activity record produced by a provider integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedActivity {
    pub id: String,
    /// Provider identifier (e.g. `gitlab`, `github`).
    pub provider: String,
    pub account_id: String,
    /// Identifier of the activity in the provider's own API.
    pub source_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Provider-specific fields preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Sort activities newest first.
pub fn sort_newest_first(activities: &mut [UnifiedActivity]) {
    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// A configured provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Self-hosted instance host, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

// =============================================================================
// Day index
// =============================================================================

/// Fetch metadata for one (account, day) partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub fetched_at: DateTime<Utc>,
    pub count: usize,
}

/// Per-account, per-day fetch metadata.
///
/// The presence of a `DayStatus` is the only signal that a day has been
/// durably fetched; the activity files are never consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayIndex {
    accounts: BTreeMap<String, BTreeMap<DateKey, DayStatus>>,
}

impl DayIndex {
    #[must_use]
    pub fn status(&self, account_id: &str, date: DateKey) -> Option<&DayStatus> {
        self.accounts.get(account_id)?.get(&date)
    }

    #[must_use]
    pub fn is_fetched(&self, account_id: &str, date: DateKey) -> bool {
        self.status(account_id, date).is_some()
    }

    /// Record (or overwrite) the status of a day.
    pub fn record(&mut self, account_id: &str, date: DateKey, status: DayStatus) {
        self.accounts
            .entry(account_id.to_string())
            .or_default()
            .insert(date, status);
    }

    /// Drop an account and all its days. Returns whether it was present.
    pub fn remove_account(&mut self, account_id: &str) -> bool {
        self.accounts.remove(account_id).is_some()
    }

    /// Fetched days for an account, ascending.
    #[must_use]
    pub fn dates_for(&self, account_id: &str) -> Vec<DateKey> {
        self.accounts
            .get(account_id)
            .map(|days| days.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Day statuses for one account.
    #[must_use]
    pub fn days(&self, account_id: &str) -> Option<&BTreeMap<DateKey, DayStatus>> {
        self.accounts.get(account_id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Index-only heatmap across every account: counts summed per date,
    /// ascending by date, with no provider breakdown.
    #[must_use]
    pub fn compute_heatmap_buckets(&self) -> Vec<HeatMapBucket> {
        let mut totals: BTreeMap<DateKey, usize> = BTreeMap::new();
        for days in self.accounts.values() {
            for (date, status) in days {
                *totals.entry(*date).or_default() += status.count;
            }
        }
        totals
            .into_iter()
            .map(|(date, count)| HeatMapBucket::new(date, count))
            .collect()
    }

    /// Index-only heatmap for one account.
    #[must_use]
    pub fn compute_heatmap_buckets_for(&self, account_id: &str) -> Vec<HeatMapBucket> {
        self.accounts
            .get(account_id)
            .map(|days| {
                days.iter()
                    .map(|(date, status)| HeatMapBucket::new(*date, status.count))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Heatmap buckets
// =============================================================================

/// Activity count for one calendar day, optionally broken down by provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatMapBucket {
    pub date: DateKey,
    pub count: usize,
    #[serde(default)]
    pub breakdown: BTreeMap<String, usize>,
}

impl HeatMapBucket {
    #[must_use]
    pub const fn new(date: DateKey, count: usize) -> Self {
        Self {
            date,
            count,
            breakdown: BTreeMap::new(),
        }
    }

    /// Group activities by UTC day, counting per provider.
    #[must_use]
    pub fn from_activities(activities: &[UnifiedActivity]) -> Vec<Self> {
        let mut buckets: BTreeMap<DateKey, Self> = BTreeMap::new();
        for activity in activities {
            let date = DateKey::from_instant(activity.timestamp);
            let bucket = buckets.entry(date).or_insert_with(|| Self::new(date, 0));
            bucket.count += 1;
            *bucket
                .breakdown
                .entry(activity.provider.clone())
                .or_default() += 1;
        }
        buckets.into_values().collect()
    }

    fn absorb(&mut self, other: &Self) {
        self.count += other.count;
        for (provider, count) in &other.breakdown {
            *self.breakdown.entry(provider.clone()).or_default() += count;
        }
    }
}

/// Merge two bucket lists by date.
///
/// Counts are summed and breakdowns unioned with per-provider sums. The result
/// is sorted ascending by date, so the merge is commutative and associative.
#[must_use]
pub fn merge_heatmap_buckets(left: &[HeatMapBucket], right: &[HeatMapBucket]) -> Vec<HeatMapBucket> {
    merge_all_heatmap_buckets([left, right])
}

/// Merge any number of bucket lists. See [`merge_heatmap_buckets`].
#[must_use]
pub fn merge_all_heatmap_buckets<'a, I>(lists: I) -> Vec<HeatMapBucket>
where
    I: IntoIterator<Item = &'a [HeatMapBucket]>,
{
    let mut merged: BTreeMap<DateKey, HeatMapBucket> = BTreeMap::new();
    for list in lists {
        for bucket in list {
            merged
                .entry(bucket.date)
                .or_insert_with(|| HeatMapBucket::new(bucket.date, 0))
                .absorb(bucket);
        }
    }
    merged.into_values().collect()
}
