//! Configured-accounts registry.
//!
//! A single record with no TTL. Saving replaces the whole list.

use super::gateway::{CacheQueue, Gateway, Ttl, or_absent};
use super::keys::{ACCOUNTS_KEY, key_path};
use crate::core::models::Account;

/// Handle to the account registry.
#[derive(Clone)]
pub struct AccountRegistry {
    queue: CacheQueue,
}

impl AccountRegistry {
    pub(crate) const fn new(queue: CacheQueue) -> Self {
        Self { queue }
    }

    pub async fn save(&self, accounts: Vec<Account>) {
        self.queue
            .write("save accounts", move |gw| gw.write(&key_path(ACCOUNTS_KEY), &accounts))
            .await;
    }

    /// The stored account list, or `None` if never saved.
    pub async fn load(&self) -> Option<Vec<Account>> {
        self.queue
            .read("load accounts", |gw| gw.read(&key_path(ACCOUNTS_KEY), Ttl::Infinite))
            .await
    }
}

pub(crate) fn read_accounts(gw: &Gateway) -> Option<Vec<Account>> {
    or_absent(gw.read(&key_path(ACCOUNTS_KEY), Ttl::Infinite), "read accounts")
}
