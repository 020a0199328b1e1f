//! Token Store
//!
//! Holds the current access token in memory and mirrors it to durable
//! storage so a reload keeps the session. Storage failures are logged and
//! never block the in-memory state.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use platform::storage::KeyValueStore;

use crate::domain::value_object::session_token::SessionToken;

pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    current: RwLock<Option<SessionToken>>,
    flush_lock: Mutex<()>,
}

impl TokenStore {
    /// Open the store, picking up a token left by a previous run.
    pub fn load(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let current = match storage.get(&key) {
            Ok(raw) => raw.and_then(SessionToken::new),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Failed to read stored token");
                None
            }
        };

        if let Some(token) = &current {
            tracing::debug!(token = %token.fingerprint(), "Loaded stored token");
        }

        Self {
            storage,
            key,
            current: RwLock::new(current),
            flush_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<SessionToken> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_present(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the token (last writer wins).
    pub fn set(&self, token: SessionToken) {
        self.stage(Some(token));
        self.flush();
    }

    /// Drop the token. Returns whether one was held.
    pub fn clear(&self) -> bool {
        let had_token = self.stage(None);
        self.flush();
        had_token
    }

    /// Swap the in-memory token without touching storage. Returns whether
    /// a token was held before.
    pub(crate) fn stage(&self, token: Option<SessionToken>) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        match (&token, &*current) {
            (Some(next), _) => tracing::debug!(token = %next.fingerprint(), "Token stored"),
            (None, Some(previous)) => {
                tracing::debug!(token = %previous.fingerprint(), "Token cleared")
            }
            (None, None) => {}
        }
        std::mem::replace(&mut *current, token).is_some()
    }

    /// Mirror the in-memory token to durable storage.
    ///
    /// Writes whatever is current when the flush runs, so flushes that
    /// finish out of order still leave storage matching memory.
    pub(crate) fn flush(&self) {
        let _flush = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let result = match self.get() {
            Some(token) => self.storage.set(&self.key, token.as_str()),
            None => self.storage.remove(&self.key),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist token; storage may be stale after a reload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::storage::{FileStore, MemoryStore, StorageError};

    fn token(raw: &str) -> SessionToken {
        SessionToken::new(raw).unwrap()
    }

    #[test]
    fn set_get_clear() {
        let store = TokenStore::load(Arc::new(MemoryStore::new()), "access-token");
        assert!(store.get().is_none());

        store.set(token("tok123"));
        assert_eq!(store.get().unwrap().as_str(), "tok123");

        store.set(token("tok456"));
        assert_eq!(store.get().unwrap().as_str(), "tok456");

        assert!(store.clear());
        assert!(store.get().is_none());
        assert!(!store.clear());
    }

    #[test]
    fn token_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = TokenStore::load(Arc::new(FileStore::open(&path).unwrap()), "access-token");
        store.set(token("tok123"));
        drop(store);

        let reloaded = TokenStore::load(Arc::new(FileStore::open(&path).unwrap()), "access-token");
        assert_eq!(reloaded.get().unwrap().as_str(), "tok123");
        reloaded.clear();

        let after_clear =
            TokenStore::load(Arc::new(FileStore::open(&path).unwrap()), "access-token");
        assert!(after_clear.get().is_none());
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn in_memory_copy_works_when_storage_fails() {
        let store = TokenStore::load(Arc::new(BrokenStore), "access-token");
        assert!(store.get().is_none());
        store.set(token("tok123"));
        assert!(store.is_present());
        assert!(store.clear());
        assert!(!store.is_present());
    }

    #[test]
    fn staged_token_reaches_storage_on_flush() {
        let storage = Arc::new(MemoryStore::new());
        let store = TokenStore::load(storage.clone(), "access-token");

        assert!(!store.stage(Some(token("tok123"))));
        assert_eq!(store.get().unwrap().as_str(), "tok123");
        assert!(storage.get("access-token").unwrap().is_none());

        store.flush();
        assert_eq!(storage.get("access-token").unwrap().as_deref(), Some("tok123"));

        assert!(store.stage(None));
        store.flush();
        store.flush();
        assert!(storage.get("access-token").unwrap().is_none());
    }
}
