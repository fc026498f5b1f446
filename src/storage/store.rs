//! Activity store facade.
//!
//! One `ActivityStore` per process owns the cache root and its serial
//! worker. The range cache, day cache, heatmaps, and account registry are
//! independent strategies that share that worker, so their index
//! read-modify-write sequences never interleave.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::accounts::AccountRegistry;
use super::day_cache::{DEFAULT_TODAY_TTL_SECS, DayPartitionedActivityCache, clear_days};
use super::gateway::{CacheQueue, Gateway, Ttl};
use super::heatmap::{DEFAULT_HEATMAP_TTL_SECS, HeatmapStore};
use super::range_cache::{DEFAULT_RANGE_TTL_SECS, RangeActivityCache, clear_ranges};
use crate::error::Result;

/// Freshness policy per data class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub range_ttl: Ttl,
    pub heatmap_ttl: Ttl,
    /// Age after which today's day partition is stale.
    pub today_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            range_ttl: Ttl::from_secs(DEFAULT_RANGE_TTL_SECS),
            heatmap_ttl: Ttl::from_secs(DEFAULT_HEATMAP_TTL_SECS),
            today_ttl: Duration::from_secs(DEFAULT_TODAY_TTL_SECS),
        }
    }
}

/// Handle to the file-backed caches. Cheap to clone.
#[derive(Clone)]
pub struct ActivityStore {
    root: PathBuf,
    queue: CacheQueue,
    policy: CachePolicy,
}

impl ActivityStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    /// Returns an error if the root cannot be created or the worker cannot start.
    pub fn open(root: impl Into<PathBuf>, policy: CachePolicy) -> Result<Self> {
        let root = root.into();
        let queue = CacheQueue::start(Gateway::new(&root)?)?;
        tracing::debug!(root = %root.display(), "opened activity store");
        Ok(Self {
            root,
            queue,
            policy,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn policy(&self) -> CachePolicy {
        self.policy
    }

    #[must_use]
    pub fn range(&self) -> RangeActivityCache {
        RangeActivityCache::new(self.queue.clone(), self.policy.range_ttl)
    }

    #[must_use]
    pub fn days(&self) -> DayPartitionedActivityCache {
        DayPartitionedActivityCache::new(self.queue.clone(), self.policy.today_ttl)
    }

    #[must_use]
    pub fn heatmaps(&self) -> HeatmapStore {
        HeatmapStore::new(self.queue.clone(), self.policy.heatmap_ttl)
    }

    #[must_use]
    pub fn accounts(&self) -> AccountRegistry {
        AccountRegistry::new(self.queue.clone())
    }

    /// Drop everything cached for an account (range windows, day partitions,
    /// day index entry, heatmap) in a single unit of work.
    ///
    /// A failure in one strategy does not stop the other from clearing.
    pub async fn clear_account(&self, account_id: &str) {
        let account_id = account_id.to_string();
        self.queue
            .write("clear account", move |gw| {
                let ranges = clear_ranges(gw, &account_id);
                let days = clear_days(gw, &account_id);
                ranges.and(days)
            })
            .await;
    }

    /// Remove every cached entry, including the account registry.
    pub async fn clear_all(&self) {
        self.queue.write("clear all", Gateway::clear).await;
    }
}
