//! Secure storage backends.
//!
//! A backend holds exactly one secret record. The token store never creates
//! per-account records.

use std::cell::Cell;

use thiserror::Error;

use crate::error::StoreError;

/// Account name of the single secure record.
pub const TOKEN_RECORD: &str = "all-tokens";

/// Default secure-storage service name.
pub const DEFAULT_KEYRING_SERVICE: &str = "activity-store";

/// Status reported when a record is missing.
pub const STATUS_NOT_FOUND: i32 = 404;

/// Failure reported by a secure storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The record does not exist.
    #[error("secure record not found")]
    NotFound,

    /// The platform rejected the request.
    #[error("platform rejected request (status {status}): {message}")]
    Platform { status: i32, message: String },
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound => Self::Platform {
                status: STATUS_NOT_FOUND,
                message: "secure record not found".to_string(),
            },
            BackendError::Platform { status, message } => Self::Platform { status, message },
        }
    }
}

/// One secret record in platform secure storage.
///
/// `update` must fail with [`BackendError::NotFound`] when the record does
/// not exist yet; `create` may overwrite.
pub trait SecureBackend: Send {
    /// Read the record, `None` if it does not exist.
    fn get(&self) -> Result<Option<String>, BackendError>;

    /// Replace the payload of an existing record.
    fn update(&self, secret: &str) -> Result<(), BackendError>;

    /// Create the record.
    fn create(&self, secret: &str) -> Result<(), BackendError>;

    /// Remove the record.
    fn delete(&self) -> Result<(), BackendError>;
}

/// Backend using the operating system keychain via `keyring`.
///
/// Remembers whether the record exists after any successful access, so an
/// update of a record known to be missing fails without touching the
/// keychain.
pub struct KeyringBackend {
    entry: keyring::Entry,
    present: Cell<Option<bool>>,
}

impl KeyringBackend {
    /// Bind to the token record of `service`.
    ///
    /// # Errors
    /// Returns `Platform` if the keychain rejects the service/account pair.
    pub fn new(service: &str) -> Result<Self, BackendError> {
        let entry = keyring::Entry::new(service, TOKEN_RECORD).map_err(map_keyring_error)?;
        Ok(Self::with_entry(entry))
    }

    fn with_entry(entry: keyring::Entry) -> Self {
        Self {
            entry,
            present: Cell::new(None),
        }
    }

    fn track<T>(&self, result: Result<T, BackendError>, present: bool) -> Result<T, BackendError> {
        match &result {
            Ok(_) => self.present.set(Some(present)),
            Err(BackendError::NotFound) => self.present.set(Some(false)),
            Err(BackendError::Platform { .. }) => self.present.set(None),
        }
        result
    }
}

impl SecureBackend for KeyringBackend {
    fn get(&self) -> Result<Option<String>, BackendError> {
        let secret = match self.entry.get_password() {
            Ok(secret) => Some(secret),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => return self.track(Err(map_keyring_error(e)), false),
        };
        let present = secret.is_some();
        self.track(Ok(secret), present)
    }

    fn update(&self, secret: &str) -> Result<(), BackendError> {
        match self.present.get() {
            Some(false) => return Err(BackendError::NotFound),
            Some(true) => {}
            // The keychain API has no update-only call; probe once.
            None => {
                let probe = self.entry.get_password().map_err(map_keyring_error);
                self.track(probe, true)?;
            }
        }
        let result = self.entry.set_password(secret).map_err(map_keyring_error);
        self.track(result, true)
    }

    fn create(&self, secret: &str) -> Result<(), BackendError> {
        let result = self.entry.set_password(secret).map_err(map_keyring_error);
        self.track(result, true)
    }

    fn delete(&self) -> Result<(), BackendError> {
        let result = self.entry.delete_credential().map_err(map_keyring_error);
        self.track(result, false)
    }
}

/// Map a keychain error to a backend error with a stable status code.
fn map_keyring_error(err: keyring::Error) -> BackendError {
    let status = match &err {
        keyring::Error::NoEntry => return BackendError::NotFound,
        keyring::Error::PlatformFailure(_) => 1,
        keyring::Error::NoStorageAccess(_) => 2,
        keyring::Error::BadEncoding(_) => 3,
        keyring::Error::TooLong(_, _) => 4,
        keyring::Error::Invalid(_, _) => 5,
        keyring::Error::Ambiguous(_) => 6,
        _ => 99,
    };
    BackendError::Platform {
        status,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyring::mock::MockCredential;

    fn mock_backend() -> KeyringBackend {
        let credential: Box<keyring::Credential> = Box::new(MockCredential::default());
        KeyringBackend::with_entry(keyring::Entry::new_with_credential(credential))
    }

    fn inject(backend: &KeyringBackend, err: keyring::Error) {
        backend
            .entry
            .get_credential()
            .downcast_ref::<MockCredential>()
            .unwrap()
            .set_error(err);
    }

    #[test]
    fn test_keyring_update_missing_then_create() {
        let backend = mock_backend();
        assert_eq!(backend.get(), Ok(None));
        assert_eq!(backend.update("{}"), Err(BackendError::NotFound));
        backend.create("{\"a\":{}}").unwrap();
        backend.update("{}").unwrap();
        assert_eq!(backend.get(), Ok(Some("{}".to_string())));
    }

    #[test]
    fn test_keyring_update_of_known_missing_record_skips_keychain() {
        let backend = mock_backend();
        assert_eq!(backend.get(), Ok(None));

        // A pending failure is only consumed by a real keychain call.
        inject(&backend, keyring::Error::Invalid("a".to_string(), "b".to_string()));
        assert_eq!(backend.update("{}"), Err(BackendError::NotFound));
        assert!(matches!(
            backend.create("{}"),
            Err(BackendError::Platform { status: 5, .. })
        ));
    }

    #[test]
    fn test_keyring_update_without_prior_read_probes() {
        let backend = mock_backend();
        assert_eq!(backend.update("{}"), Err(BackendError::NotFound));
        backend.create("{}").unwrap();

        let backend = mock_backend();
        inject(&backend, keyring::Error::Invalid("a".to_string(), "b".to_string()));
        assert!(matches!(
            backend.update("{}"),
            Err(BackendError::Platform { status: 5, .. })
        ));
    }

    #[test]
    fn test_keyring_delete_marks_record_missing() {
        let backend = mock_backend();
        backend.create("{}").unwrap();
        backend.delete().unwrap();
        assert_eq!(backend.update("{}"), Err(BackendError::NotFound));
        assert_eq!(backend.get(), Ok(None));
    }

    #[test]
    fn test_no_entry_maps_to_not_found() {
        assert_eq!(map_keyring_error(keyring::Error::NoEntry), BackendError::NotFound);
    }

    #[test]
    fn test_keyring_errors_carry_status() {
        let err = map_keyring_error(keyring::Error::TooLong("password".to_string(), 4096));
        assert!(matches!(err, BackendError::Platform { status: 4, .. }));
    }

    #[test]
    fn test_backend_error_converts_to_platform() {
        let err: StoreError = BackendError::Platform {
            status: 2,
            message: "locked".to_string(),
        }
        .into();
        assert_eq!(err.platform_status(), Some(2));
        assert!(err.requires_reauth());
    }
}
