//! Per-account heatmap cache and cross-account merge.
//!
//! Each account's buckets are stored whole (no merge on save) with a finite
//! TTL. `load_all` merges every enabled account; an account whose heatmap is
//! absent or expired contributes its index-only buckets instead, which have
//! correct totals but no provider breakdown.

use super::accounts::read_accounts;
use super::day_cache::read_day_index;
use super::gateway::{CacheQueue, Gateway, Ttl, or_absent, or_logged};
use super::keys::{day_file_path, heatmap_key, key_path};
use crate::core::models::{HeatMapBucket, UnifiedActivity, merge_all_heatmap_buckets};

/// Default freshness of a per-account heatmap.
pub const DEFAULT_HEATMAP_TTL_SECS: u64 = 6 * 3600;

/// Handle to the heatmap cache.
#[derive(Clone)]
pub struct HeatmapStore {
    queue: CacheQueue,
    ttl: Ttl,
}

impl HeatmapStore {
    pub(crate) const fn new(queue: CacheQueue, ttl: Ttl) -> Self {
        Self { queue, ttl }
    }

    /// Replace an account's heatmap.
    pub async fn save(&self, account_id: &str, buckets: Vec<HeatMapBucket>) {
        let key = heatmap_key(account_id);
        self.queue
            .write("save heatmap", move |gw| gw.write(&key_path(&key), &buckets))
            .await;
    }

    /// An account's heatmap if cached and fresh.
    pub async fn load(&self, account_id: &str) -> Option<Vec<HeatMapBucket>> {
        let key = heatmap_key(account_id);
        let ttl = self.ttl;
        self.queue
            .read("load heatmap", move |gw| gw.read(&key_path(&key), ttl))
            .await
    }

    /// Merged heatmap across enabled accounts, ascending by date.
    pub async fn load_all(&self) -> Vec<HeatMapBucket> {
        let ttl = self.ttl;
        self.queue
            .query("load all heatmaps", move |gw| load_all_heatmaps(gw, ttl))
            .await
            .unwrap_or_default()
    }

    /// Index-only heatmap across every account in the day index.
    pub async fn compute_from_index(&self) -> Vec<HeatMapBucket> {
        self.queue
            .query("compute heatmap from index", |gw| {
                read_day_index(gw).compute_heatmap_buckets()
            })
            .await
            .unwrap_or_default()
    }

    /// Rebuild an account's heatmap from its cached day partitions and store it.
    pub async fn recompute(&self, account_id: &str) -> Vec<HeatMapBucket> {
        let account_id = account_id.to_string();
        self.queue
            .query("recompute heatmap", move |gw| recompute_heatmap(gw, &account_id))
            .await
            .unwrap_or_default()
    }

    pub async fn clear(&self, account_id: &str) {
        let key = heatmap_key(account_id);
        self.queue
            .write("clear heatmap", move |gw| gw.delete(&key_path(&key)))
            .await;
    }
}

fn load_all_heatmaps(gw: &Gateway, ttl: Ttl) -> Vec<HeatMapBucket> {
    let index = read_day_index(gw);
    let account_ids: Vec<String> = read_accounts(gw).map_or_else(
        || index.accounts().map(str::to_string).collect(),
        |accounts| {
            accounts
                .into_iter()
                .filter(|a| a.enabled)
                .map(|a| a.id)
                .collect()
        },
    );

    let per_account: Vec<Vec<HeatMapBucket>> = account_ids
        .iter()
        .map(|id| {
            or_absent(gw.read(&key_path(&heatmap_key(id)), ttl), "load heatmap")
                .unwrap_or_else(|| {
                    tracing::debug!(account = %id, "heatmap missing; using day index");
                    index.compute_heatmap_buckets_for(id)
                })
        })
        .collect();

    merge_all_heatmap_buckets(per_account.iter().map(Vec::as_slice))
}

fn recompute_heatmap(gw: &Gateway, account_id: &str) -> Vec<HeatMapBucket> {
    let index = read_day_index(gw);
    let activities: Vec<UnifiedActivity> = index
        .dates_for(account_id)
        .into_iter()
        .filter_map(|date| {
            or_absent(
                gw.read::<Vec<UnifiedActivity>>(&day_file_path(account_id, date), Ttl::Infinite),
                "load day partition",
            )
        })
        .flatten()
        .collect();

    let buckets = HeatMapBucket::from_activities(&activities);
    or_logged(
        gw.write(&key_path(&heatmap_key(account_id)), &buckets),
        "save recomputed heatmap",
    );
    buckets
}
