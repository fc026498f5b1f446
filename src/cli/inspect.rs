//! Cache inspection commands.

use serde_json::json;

use super::{emit, resolved_paths_json};
use crate::core::date_key::DateKey;
use crate::error::Result;
use crate::storage::{ActivityStore, ResolvedConfig};

/// `paths`: resolved locations and their sources.
///
/// # Errors
/// Returns an error if the output cannot be serialized.
pub fn execute_paths(config: &ResolvedConfig) -> Result<()> {
    emit("paths", resolved_paths_json(config))
}

/// `index`: the day index, optionally for one account.
///
/// # Errors
/// Returns an error if the output cannot be serialized.
pub async fn execute_index(store: &ActivityStore, account: Option<&str>) -> Result<()> {
    let index = store.days().get_index().await;
    let data = match account {
        Some(account) => serde_json::to_value(index.days(account))?,
        None => serde_json::to_value(&index)?,
    };
    emit("index", data)
}

/// `heatmap`: merged buckets across accounts.
///
/// # Errors
/// Returns an error if the output cannot be serialized.
pub async fn execute_heatmap(store: &ActivityStore, index_only: bool) -> Result<()> {
    let heatmaps = store.heatmaps();
    let buckets = if index_only {
        heatmaps.compute_from_index().await
    } else {
        heatmaps.load_all().await
    };
    emit("heatmap", serde_json::to_value(buckets)?)
}

/// `accounts`: the registry, `null` if never saved.
///
/// # Errors
/// Returns an error if the output cannot be serialized.
pub async fn execute_accounts(store: &ActivityStore) -> Result<()> {
    let accounts = store.accounts().load().await;
    emit("accounts", serde_json::to_value(accounts)?)
}

/// `day`: one cached partition with its index status.
///
/// # Errors
/// Returns an error if the output cannot be serialized.
pub async fn execute_day(store: &ActivityStore, account: &str, date: DateKey) -> Result<()> {
    let days = store.days();
    let index = days.get_index().await;
    let activities = days.load_day(account, date).await;
    let stale = date.is_today() && days.is_today_stale(account).await;

    let data = json!({
        "account": account,
        "date": date,
        "status": index.status(account, date),
        "stale": stale,
        "activities": activities,
    });
    emit("day", data)
}

/// `clear`: drop every cached entry for an account.
///
/// # Errors
/// Returns an error if the output cannot be serialized.
pub async fn execute_clear(store: &ActivityStore, account: &str) -> Result<()> {
    store.clear_account(account).await;
    tracing::info!(account, "cleared cached data");
    emit("clear", json!({ "account": account, "cleared": true }))
}
