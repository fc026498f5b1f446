//! Batched credential storage.
//!
//! Every account's credential pair lives in one [`TokenBlob`], persisted as a
//! single secure record so the platform prompts at most once per process.
//! The blob is loaded lazily on first use and kept resident; each mutation
//! writes the whole blob through.
//!
//! All operations run on a dedicated serial worker, independent of the file
//! caches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::backend::{BackendError, KeyringBackend, SecureBackend, TOKEN_RECORD};
use super::keys::{TokenKey, TokenSlot};
use crate::core::worker::SerialWorker;
use crate::error::{Result, StoreError};

/// Access and refresh credentials of one base account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl TokenPair {
    #[must_use]
    pub const fn slot(&self, slot: TokenSlot) -> Option<&String> {
        match slot {
            TokenSlot::Access => self.access.as_ref(),
            TokenSlot::Refresh => self.refresh.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: TokenSlot) -> &mut Option<String> {
        match slot {
            TokenSlot::Access => &mut self.access,
            TokenSlot::Refresh => &mut self.refresh,
        }
    }

    const fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Base account id to credential pair.
pub type TokenBlob = BTreeMap<String, TokenPair>;

/// Steps of the write-through fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PersistStep {
    Update,
    Create,
    Replace,
}

/// Worker-owned state: the backend and the resident blob.
pub struct TokenState {
    backend: Box<dyn SecureBackend>,
    blob: Option<TokenBlob>,
}

impl TokenState {
    fn new(backend: Box<dyn SecureBackend>) -> Self {
        Self {
            backend,
            blob: None,
        }
    }

    /// The resident blob, loading it on first access.
    ///
    /// A platform failure leaves the blob unloaded so the next call retries.
    fn blob(&mut self) -> Result<&TokenBlob> {
        if self.blob.is_none() {
            self.blob = Some(self.load()?);
        }
        Ok(self.blob.get_or_insert_with(TokenBlob::default))
    }

    fn load(&self) -> Result<TokenBlob> {
        let Some(payload) = self.backend.get()? else {
            tracing::debug!("no secure token record yet");
            return Ok(TokenBlob::default());
        };

        match serde_json::from_str::<TokenBlob>(&payload) {
            Ok(blob) => {
                tracing::debug!(accounts = blob.len(), "loaded token blob");
                Ok(blob)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token blob undecodable; starting empty");
                Ok(TokenBlob::default())
            }
        }
    }

    /// Persist `next` and make it resident. On failure the resident blob is
    /// left unchanged.
    fn commit(&mut self, next: TokenBlob) -> Result<()> {
        let payload = serde_json::to_string(&next).map_err(|e| StoreError::Encoding {
            key: TOKEN_RECORD.to_string(),
            message: e.to_string(),
        })?;
        self.persist(&payload)?;
        self.blob = Some(next);
        Ok(())
    }

    fn persist(&self, payload: &str) -> Result<()> {
        let mut step = PersistStep::Update;
        loop {
            step = match step {
                PersistStep::Update => match self.backend.update(payload) {
                    Ok(()) => return Ok(()),
                    Err(BackendError::NotFound) => {
                        tracing::debug!("token record missing; creating");
                        PersistStep::Create
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "token record update failed; replacing");
                        PersistStep::Replace
                    }
                },
                PersistStep::Create => return Ok(self.backend.create(payload)?),
                PersistStep::Replace => {
                    match self.backend.delete() {
                        Ok(()) | Err(BackendError::NotFound) => {}
                        Err(e) => return Err(e.into()),
                    }
                    PersistStep::Create
                }
            };
        }
    }

    fn get(&mut self, key: &TokenKey) -> Result<Option<String>> {
        Ok(self
            .blob()?
            .get(&key.base_id)
            .and_then(|pair| pair.slot(key.slot))
            .cloned())
    }

    fn set(&mut self, key: &TokenKey, token: String) -> Result<()> {
        let mut next = self.blob()?.clone();
        *next.entry(key.base_id.clone()).or_default().slot_mut(key.slot) = Some(token);
        self.commit(next)?;
        tracing::debug!(account = %key.base_id, slot = %key.slot, "stored token");
        Ok(())
    }

    fn delete(&mut self, key: &TokenKey) -> Result<()> {
        let mut next = self.blob()?.clone();
        let changed = match key.slot {
            TokenSlot::Access => next.remove(&key.base_id).is_some(),
            TokenSlot::Refresh => match next.get_mut(&key.base_id) {
                Some(pair) => {
                    let had = pair.refresh.take().is_some();
                    if pair.is_empty() {
                        next.remove(&key.base_id);
                    }
                    had
                }
                None => false,
            },
        };

        if !changed {
            return Ok(());
        }
        self.commit(next)?;
        tracing::debug!(account = %key.base_id, slot = %key.slot, "deleted token");
        Ok(())
    }

    fn clear_all(&mut self) -> Result<()> {
        match self.backend.delete() {
            Ok(()) | Err(BackendError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        self.blob = Some(TokenBlob::default());
        tracing::debug!("cleared token record");
        Ok(())
    }
}

/// Handle to the credential store. Cheap to clone.
#[derive(Clone)]
pub struct SecureTokenStore {
    worker: SerialWorker<TokenState>,
}

impl SecureTokenStore {
    /// Start a store over `backend`. Nothing is read until first use.
    ///
    /// # Errors
    /// Returns an error if the worker thread cannot be spawned.
    pub fn new(backend: impl SecureBackend + 'static) -> Result<Self> {
        let state = TokenState::new(Box::new(backend));
        Ok(Self {
            worker: SerialWorker::spawn("token-store", state)?,
        })
    }

    /// Store backed by the OS keychain under `service`.
    ///
    /// # Errors
    /// Returns `Platform` if the keychain entry cannot be created.
    pub fn open_keyring(service: &str) -> Result<Self> {
        Self::new(KeyringBackend::new(service)?)
    }

    /// The token addressed by `key`, if set.
    ///
    /// # Errors
    /// Returns `InvalidTokenKey` or a `Platform` failure while loading.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = TokenKey::parse(key)?;
        self.worker.exec(move |state| state.get(&key)).await?
    }

    /// Store `token` under `key` and write the blob through.
    ///
    /// # Errors
    /// Returns `InvalidTokenKey`, `Encoding`, or `Platform`.
    pub async fn set(&self, key: &str, token: impl Into<String>) -> Result<()> {
        let key = TokenKey::parse(key)?;
        let token = token.into();
        self.worker.exec(move |state| state.set(&key, token)).await?
    }

    /// Delete a token. Deleting the access key removes the whole account.
    ///
    /// Deleting the refresh key clears only that slot, except that an
    /// account left with neither slot set is dropped from the blob, so it no
    /// longer appears in [`list`](Self::list).
    ///
    /// # Errors
    /// Returns `InvalidTokenKey`, `Encoding`, or `Platform`.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let key = TokenKey::parse(key)?;
        self.worker.exec(move |state| state.delete(&key)).await?
    }

    /// Base account ids with at least one stored token.
    ///
    /// # Errors
    /// Returns `Platform` if the record cannot be loaded.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.worker
            .exec(|state| -> Result<Vec<String>> { Ok(state.blob()?.keys().cloned().collect()) })
            .await?
    }

    /// Whether `key` currently has a token.
    ///
    /// # Errors
    /// See [`SecureTokenStore::get`].
    pub async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove the secure record entirely.
    ///
    /// # Errors
    /// Returns `Platform` unless the record was already missing.
    pub async fn clear_all(&self) -> Result<()> {
        self.worker.exec(TokenState::clear_all).await?
    }
}
