//! Browsing-session identifiers.
//!
//! The id is created lazily and stored in session-scoped storage, so it lives
//! exactly as long as that storage does.

use crate::platform::{KeyValueStore, StoreError};

/// Session-storage key holding the current session id.
pub const SESSION_ID_KEY: &str = "analytics_session_id";

/// Resolves the session id through a session-scoped store.
pub struct SessionIdProvider {
    store: Box<dyn KeyValueStore>,
    /// Last id handed out
    cached: Option<String>,
    /// The cached id never reached the store, so an empty store does not
    /// mean the session ended
    unpersisted: bool,
}

impl SessionIdProvider {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: None,
            unpersisted: false,
        }
    }

    /// Return the current session id, creating one if absent.
    ///
    /// Never empty. Repeated calls return the same value until the session
    /// storage is cleared or [`reset`](Self::reset) is called.
    pub fn session_id(&mut self, now_millis: i64) -> String {
        match self.store.get(SESSION_ID_KEY) {
            Ok(Some(id)) if !id.is_empty() => {
                self.cached = Some(id.clone());
                self.unpersisted = false;
                return id;
            }
            Ok(_) => {
                // An empty store ends the session, unless the cached id
                // never got written to it.
                if !self.unpersisted {
                    self.cached = None;
                }
            }
            Err(e) => tracing::warn!("Failed to read session id: {}", e),
        }

        let id = match self.cached.clone() {
            Some(id) => id,
            None => generate_session_id(now_millis),
        };
        self.persist(&id);
        self.cached = Some(id.clone());
        id
    }

    /// End the current session. The next lookup creates a new id.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.cached = None;
        self.unpersisted = false;
        self.store.remove(SESSION_ID_KEY)
    }

    fn persist(&mut self, id: &str) {
        match self.store.set(SESSION_ID_KEY, id) {
            Ok(()) => self.unpersisted = false,
            Err(e) => {
                tracing::warn!("Failed to persist session id: {}", e);
                self.unpersisted = true;
            }
        }
    }
}

/// Build an id of the form `session_<epoch-ms>_<random-suffix>`.
pub fn generate_session_id(now_millis: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", now_millis, &suffix[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id(1_700_000_000_123);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert_eq!(parts[1], "1700000000123");
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn test_session_id_is_idempotent() {
        let store = MemoryStore::new();
        let mut provider = SessionIdProvider::new(Box::new(store.clone()));

        let first = provider.session_id(1);
        let second = provider.session_id(2);
        assert_eq!(first, second);
        assert!(!first.is_empty());
        assert_eq!(store.get(SESSION_ID_KEY).unwrap(), Some(first));
    }

    #[test]
    fn test_reset_creates_new_session() {
        let mut provider = SessionIdProvider::new(Box::new(MemoryStore::new()));

        let first = provider.session_id(1);
        provider.reset().unwrap();
        let second = provider.session_id(1);
        assert_ne!(first, second);
    }

    #[test]
    fn test_existing_session_is_reused() {
        let store = MemoryStore::new();
        store.set(SESSION_ID_KEY, "session_42_abcdefghi").unwrap();

        let mut provider = SessionIdProvider::new(Box::new(store));
        assert_eq!(provider.session_id(99), "session_42_abcdefghi");
    }

    #[test]
    fn test_failing_store_keeps_stable_id() {
        let store = MemoryStore::new();
        store.fail_writes(true);

        let mut provider = SessionIdProvider::new(Box::new(store));
        let first = provider.session_id(1);
        assert_eq!(provider.session_id(2), first);
    }

    #[test]
    fn test_cleared_storage_starts_new_session() {
        let store = MemoryStore::new();
        let mut provider = SessionIdProvider::new(Box::new(store.clone()));

        let first = provider.session_id(1);
        store.remove(SESSION_ID_KEY).unwrap();
        let second = provider.session_id(2);

        assert_ne!(first, second);
        assert_eq!(store.get(SESSION_ID_KEY).unwrap(), Some(second.clone()));
        assert_eq!(provider.session_id(3), second);
    }

    #[test]
    fn test_recovered_store_keeps_unpersisted_id() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        let mut provider = SessionIdProvider::new(Box::new(store.clone()));
        let first = provider.session_id(1);

        store.fail_writes(false);
        assert_eq!(provider.session_id(2), first);
        assert_eq!(store.get(SESSION_ID_KEY).unwrap(), Some(first));
    }
}
