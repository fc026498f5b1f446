//! Logical credential keys.
//!
//! A key is `{provider}:{accountId}` or `{provider}:{host}:{accountId}`,
//! optionally suffixed with `:refresh` to address the refresh slot of the
//! same base account.

use std::fmt;

use crate::error::{Result, StoreError};

const REFRESH_SUFFIX: &str = ":refresh";

/// Which credential of an account a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSlot {
    Access,
    Refresh,
}

impl TokenSlot {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical key resolved to its base account id and slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub base_id: String,
    pub slot: TokenSlot,
}

impl TokenKey {
    /// Resolve a logical key.
    ///
    /// # Errors
    /// Returns `InvalidTokenKey` if the base id is empty.
    pub fn parse(key: &str) -> Result<Self> {
        let (base_id, slot) = key
            .strip_suffix(REFRESH_SUFFIX)
            .map_or((key, TokenSlot::Access), |base| (base, TokenSlot::Refresh));

        if base_id.trim().is_empty() {
            return Err(StoreError::InvalidTokenKey(key.to_string()));
        }

        Ok(Self {
            base_id: base_id.to_string(),
            slot,
        })
    }

    /// The logical key addressing the refresh slot of `base_id`.
    #[must_use]
    pub fn refresh_key(base_id: &str) -> String {
        format!("{base_id}{REFRESH_SUFFIX}")
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            TokenSlot::Access => f.write_str(&self.base_id),
            TokenSlot::Refresh => write!(f, "{}{REFRESH_SUFFIX}", self.base_id),
        }
    }
}

/// Components of a base account id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub provider: String,
    pub host: Option<String>,
    pub account_id: String,
}

/// Split a base account id into provider, optional host, and account id.
///
/// Only 2- or 3-segment keys with non-empty segments are recognised.
#[must_use]
pub fn parse_account_key(key: &str) -> Option<AccountKey> {
    let parts: Vec<&str> = key.split(':').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    match parts.as_slice() {
        [provider, account_id] => Some(AccountKey {
            provider: (*provider).to_string(),
            host: None,
            account_id: (*account_id).to_string(),
        }),
        [provider, host, account_id] => Some(AccountKey {
            provider: (*provider).to_string(),
            host: Some((*host).to_string()),
            account_id: (*account_id).to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_and_refresh_share_base() {
        let access = TokenKey::parse("gitlab:acme").unwrap();
        let refresh = TokenKey::parse("gitlab:acme:refresh").unwrap();

        assert_eq!(access.base_id, "gitlab:acme");
        assert_eq!(access.slot, TokenSlot::Access);
        assert_eq!(refresh.base_id, "gitlab:acme");
        assert_eq!(refresh.slot, TokenSlot::Refresh);
        assert_eq!(refresh.to_string(), TokenKey::refresh_key("gitlab:acme"));
    }

    #[test]
    fn test_host_keys() {
        let key = TokenKey::parse("gitlab:git.example.com:42:refresh").unwrap();
        assert_eq!(key.base_id, "gitlab:git.example.com:42");
        assert_eq!(key.slot, TokenSlot::Refresh);
    }

    #[test]
    fn test_empty_base_is_invalid() {
        assert!(matches!(TokenKey::parse(""), Err(StoreError::InvalidTokenKey(_))));
        assert!(matches!(TokenKey::parse(":refresh"), Err(StoreError::InvalidTokenKey(_))));
    }

    #[test]
    fn test_parse_account_key_segments() {
        assert_eq!(
            parse_account_key("github:me"),
            Some(AccountKey {
                provider: "github".to_string(),
                host: None,
                account_id: "me".to_string(),
            })
        );

        let hosted = parse_account_key("gitlab:git.example.com:42").unwrap();
        assert_eq!(hosted.host.as_deref(), Some("git.example.com"));
        assert_eq!(hosted.account_id, "42");

        assert_eq!(parse_account_key("github"), None);
        assert_eq!(parse_account_key("a:b:c:d"), None);
        assert_eq!(parse_account_key("github::me"), None);
    }
}
