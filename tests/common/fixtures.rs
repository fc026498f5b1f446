//! Integration test fixtures.
#![allow(dead_code)]

use std::path::Path;

use activity_store::core::DateKey;
use activity_store::storage::{ENV_CACHE_DIR, ENV_CONFIG, ENV_KEYRING_SERVICE, ENV_TODAY_TTL_SECS};
use activity_store::test_utils::make_test_activities;
use activity_store::{ActivityStore, CachePolicy};
use assert_cmd::Command;
use chrono::{DateTime, Utc};

/// Parse a `YYYY-MM-DD` day.
pub fn day(s: &str) -> DateKey {
    DateKey::parse(s).expect("valid day")
}

/// Parse an RFC 3339 instant.
pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

/// The `gitlab:acme` scenario: three activities on 2025-03-01 and a checked,
/// empty 2025-03-02.
pub async fn seed_acme(store: &ActivityStore) {
    let days = store.days();
    days.save_day(
        "gitlab:acme",
        day("2025-03-01"),
        make_test_activities("gitlab:acme", "gitlab", day("2025-03-01"), 3),
    )
    .await;
    days.save_day("gitlab:acme", day("2025-03-02"), Vec::new()).await;
}

/// Seed a store rooted at `root` from a fresh runtime, as another process
/// would before the CLI runs.
pub fn seed_acme_at(root: &Path) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    runtime.block_on(async {
        let store = ActivityStore::open(root, CachePolicy::default()).expect("open store");
        seed_acme(&store).await;
    });
}

/// `actstore` isolated from the user's environment and config file.
pub fn actstore(cache_dir: &Path) -> Command {
    actstore_with_config(cache_dir, &cache_dir.join("missing-config.toml"))
}

/// `actstore` reading its config from `config`.
#[allow(deprecated)]
pub fn actstore_with_config(cache_dir: &Path, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("actstore").expect("actstore binary");
    cmd.env_remove(ENV_CACHE_DIR)
        .env_remove(ENV_CONFIG)
        .env_remove(ENV_KEYRING_SERVICE)
        .env_remove(ENV_TODAY_TTL_SECS)
        .env_remove("ACTSTORE_LOG")
        .env_remove("ACTSTORE_LOG_FORMAT")
        .env_remove("ACTSTORE_LOG_FILE")
        .arg("--cache-dir")
        .arg(cache_dir)
        .arg("--config")
        .arg(config);
    cmd
}
