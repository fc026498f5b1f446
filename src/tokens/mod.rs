//! Secure credential storage.
//!
//! Credentials for every account are batched into one secure record. See
//! [`store::SecureTokenStore`].

pub mod backend;
pub mod keys;
pub mod store;

pub use backend::{BackendError, DEFAULT_KEYRING_SERVICE, KeyringBackend, SecureBackend, TOKEN_RECORD};
pub use keys::{AccountKey, TokenKey, TokenSlot, parse_account_key};
pub use store::{SecureTokenStore, TokenBlob, TokenPair};
