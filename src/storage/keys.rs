//! Cache key and path derivation.
//!
//! Pure functions, no I/O. Identical inputs always produce identical keys,
//! which is what makes cache hits and idempotent refetches possible.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::core::date_key::DateKey;

/// Key of the configured-accounts record.
pub const ACCOUNTS_KEY: &str = "accounts";
/// Key of the legacy range index.
pub const RANGE_INDEX_KEY: &str = "activities_index";
/// Key of the day index.
pub const DAY_INDEX_KEY: &str = "day_index";
/// Directory holding day partitions, one subdirectory per account.
pub const DAY_PARTITIONS_DIR: &str = "activities";

/// Make an account id safe for use in a file name.
#[must_use]
pub fn sanitize_account_id(account_id: &str) -> String {
    account_id.replace([':', '/'], "_")
}

/// Legacy range cache key. Only the UTC dates of the bounds matter, so
/// windows requested at different times of day share one entry.
#[must_use]
pub fn range_key(account_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    format!(
        "activities_{}_{}_{}",
        sanitize_account_id(account_id),
        DateKey::from_instant(from),
        DateKey::from_instant(to)
    )
}

#[must_use]
pub fn heatmap_key(account_id: &str) -> String {
    format!("heatmap_{}", sanitize_account_id(account_id))
}

/// Relative file path for a flat key.
#[must_use]
pub fn key_path(key: &str) -> PathBuf {
    PathBuf::from(format!("{key}.json"))
}

/// Relative directory holding one account's day partitions.
#[must_use]
pub fn day_dir(account_id: &str) -> PathBuf {
    PathBuf::from(DAY_PARTITIONS_DIR).join(sanitize_account_id(account_id))
}

/// Relative file path of one day partition.
#[must_use]
pub fn day_file_path(account_id: &str, date: DateKey) -> PathBuf {
    day_dir(account_id).join(format!("{date}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_sanitize_replaces_separators() {
        assert_eq!(sanitize_account_id("gitlab:gitlab.acme.io:me/you"), "gitlab_gitlab.acme.io_me_you");
        assert_eq!(sanitize_account_id("plain"), "plain");
    }

    #[test]
    fn test_range_key_is_deterministic() {
        let from = at("2025-03-01T10:15:00Z");
        let to = at("2025-03-08T22:00:00Z");
        let a = range_key("github:octo", from, to);
        let b = range_key("github:octo", from, to);
        assert_eq!(a, b);
        assert_eq!(a, "activities_github_octo_2025-03-01_2025-03-08");
    }

    #[test]
    fn test_range_key_uses_date_granularity() {
        let morning = range_key("a", at("2025-03-01T01:00:00Z"), at("2025-03-02T01:00:00Z"));
        let evening = range_key("a", at("2025-03-01T20:00:00Z"), at("2025-03-02T23:00:00Z"));
        assert_eq!(morning, evening);
    }

    #[test]
    fn test_keys_never_contain_separators() {
        let ids = ["gitlab:acme", "gitlab:host.io:acme", "weird/id:with/both"];
        for id in ids {
            let keys = [
                range_key(id, Utc::now(), Utc::now()),
                heatmap_key(id),
                sanitize_account_id(id),
            ];
            for key in keys {
                assert!(!key.contains(':') && !key.contains('/'), "{key}");
            }
        }
    }

    #[test]
    fn test_day_file_path_layout() {
        let date = DateKey::parse("2025-03-01").unwrap();
        let path = day_file_path("gitlab:acme", date);
        assert_eq!(path, PathBuf::from("activities/gitlab_acme/2025-03-01.json"));
        assert_eq!(key_path(DAY_INDEX_KEY), PathBuf::from("day_index.json"));
    }
}
