//! Core data models, date keys, logging, and the serial worker.

pub mod date_key;
pub mod logging;
pub mod models;
pub mod worker;

pub use date_key::DateKey;
pub use models::{
    Account, DayIndex, DayStatus, HeatMapBucket, UnifiedActivity, merge_all_heatmap_buckets,
    merge_heatmap_buckets, sort_newest_first,
};
pub use worker::SerialWorker;
