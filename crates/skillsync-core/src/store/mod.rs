//! Durable token storage.
//!
//! The session lives in three string values under fixed keys:
//! `access_token`, `refresh_token` and `current_user` (JSON). `TokenStore`
//! owns the typed view of those keys and is handed to both the HTTP
//! pipeline and the session manager; the actual medium is a pluggable
//! `KeyValueBackend`:
//!
//! - `MemoryBackend`: in-process map, for tests and ephemeral sessions
//! - `FileBackend`: JSON document on disk, optionally sealed with a passphrase
//! - `KeyringBackend`: OS credential store

pub mod file;
pub mod keyring;
pub mod memory;
pub mod seal;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::models::UserRecord;

pub use self::file::FileBackend;
pub use self::keyring::KeyringBackend;
pub use self::memory::MemoryBackend;
pub use self::seal::Sealer;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const CURRENT_USER_KEY: &str = "current_user";

/// Every key the session occupies; `clear` removes all of them together.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, CURRENT_USER_KEY];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keyring error: {0}")]
    Keyring(#[from] ::keyring::Error),

    #[error("Failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Sealed store error: {0}")]
    Seal(String),
}

/// A string key/value medium that survives process restarts.
///
/// Multi-key writes and removals must look atomic to callers: either every
/// entry is applied or the call returns an error.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Read several keys in one pass, in order. Backends whose reads are
    /// costly (a sealed file) override this.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError>;

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &str {
        "unknown"
    }
}

impl<T: KeyValueBackend + ?Sized> KeyValueBackend for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        (**self).get_many(keys)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        (**self).set_many(entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        (**self).remove_many(keys)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Access and refresh token pair as currently persisted
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access", &self.access.as_ref().map(|_| "<set>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<set>"))
            .finish()
    }
}

/// Typed, injectable view over the persisted session keys.
/// Clone is cheap and every clone shares the same backend.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl TokenStore {
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_backend(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by a fresh in-memory map
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Overwrite both tokens unconditionally
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.backend
            .set_many(&[(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)])
    }

    /// Overwrite the cached user
    pub fn set_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        self.backend.set_many(&[(CURRENT_USER_KEY, &json)])
    }

    /// Write tokens and user in one backend call
    pub fn save_session(&self, access: &str, refresh: &str, user: &UserRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        self.backend.set_many(&[
            (ACCESS_TOKEN_KEY, access),
            (REFRESH_TOKEN_KEY, refresh),
            (CURRENT_USER_KEY, &json),
        ])
    }

    /// Current tokens, read together. Backend failures read as absent.
    pub fn tokens(&self) -> StoredTokens {
        match self.backend.get_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]) {
            Ok(values) => {
                let mut values = values.into_iter().map(|v| v.filter(|s| !s.is_empty()));
                StoredTokens {
                    access: values.next().flatten(),
                    refresh: values.next().flatten(),
                }
            }
            Err(e) => {
                warn!(error = %e, backend = self.backend.name(), "Failed to read tokens from token store");
                StoredTokens::default()
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Cached user. Malformed JSON is treated as no cached user.
    pub fn user(&self) -> Option<UserRecord> {
        let raw = self.read(CURRENT_USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, backend = self.backend.name(), "Ignoring malformed cached user");
                None
            }
        }
    }

    /// Remove all session keys together
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove_many(&SESSION_KEYS)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, key, backend = self.backend.name(), "Failed to read from token store");
                None
            }
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("backend", &self.backend.name())
            .finish()
    }
}
