//! File-backed caches, configuration, and paths.

pub mod accounts;
pub mod config;
pub mod day_cache;
pub mod gateway;
pub mod heatmap;
pub mod keys;
pub mod paths;
pub mod range_cache;
pub mod store;

pub use accounts::AccountRegistry;
pub use config::{
    CacheConfig, Config, ConfigOverrides, ConfigSource, ConfigSources, CredentialsConfig,
    ENV_CACHE_DIR, ENV_CONFIG, ENV_KEYRING_SERVICE, ENV_TODAY_TTL_SECS, ResolvedConfig,
};
pub use day_cache::{DEFAULT_TODAY_TTL_SECS, DayPartitionedActivityCache};
pub use gateway::{CacheQueue, Gateway, Ttl};
pub use heatmap::{DEFAULT_HEATMAP_TTL_SECS, HeatmapStore};
pub use paths::AppPaths;
pub use range_cache::{DEFAULT_RANGE_TTL_SECS, RangeActivityCache, RangeIndex};
pub use store::{ActivityStore, CachePolicy};
