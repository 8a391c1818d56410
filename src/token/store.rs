//! Token Store
//!
//! Persisted identity/refresh token pair and the derived session flag.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

use crate::core::lock;
use crate::core::storage::KeyValueStore;
use crate::types::{TokenPair, MOCKED_TOKEN};

/// Storage key of the identity token.
pub const ID_TOKEN_KEY: &str = "id_token";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

const TOKEN_KEYS: [&str; 2] = [ID_TOKEN_KEY, REFRESH_TOKEN_KEY];

/// Owner of the persisted token pair.
///
/// Both tokens are always written and removed together. Subscribers are
/// notified whenever the session flag is written.
pub struct TokenStore<K: KeyValueStore> {
    storage: Arc<K>,
    auth_enabled: bool,
    session: watch::Sender<bool>,
    // Held across a storage write and the matching flag update.
    writes: Mutex<()>,
}

impl<K: KeyValueStore> TokenStore<K> {
    /// Create a token store. A non-empty identity token left by a previous
    /// process counts as an existing session.
    pub fn new(storage: Arc<K>, auth_enabled: bool) -> Self {
        let has_token = storage
            .get(ID_TOKEN_KEY)
            .is_some_and(|token| !token.is_empty());
        let (session, _) = watch::channel(has_token);

        Self {
            storage,
            auth_enabled,
            session,
            writes: Mutex::new(()),
        }
    }

    /// Store both tokens and mark the session as established.
    pub fn set_tokens(&self, identity_token: &str, refresh_token: &str) {
        let _guard = lock(&self.writes);
        self.storage.set_entries(&[
            (ID_TOKEN_KEY, identity_token),
            (REFRESH_TOKEN_KEY, refresh_token),
        ]);
        self.session.send_replace(!identity_token.is_empty());
        debug!("Stored token pair");
    }

    /// Store a token pair.
    pub fn store_pair(&self, tokens: &TokenPair) {
        self.set_tokens(tokens.identity_token(), tokens.refresh_token());
    }

    /// Identity token to attach to API calls.
    ///
    /// With authentication disabled this is always [`MOCKED_TOKEN`].
    pub fn identity_token(&self) -> Option<String> {
        if !self.auth_enabled {
            return Some(MOCKED_TOKEN.to_string());
        }
        self.storage.get(ID_TOKEN_KEY)
    }

    /// Stored refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// Both stored tokens, read together.
    pub fn tokens(&self) -> Option<TokenPair> {
        let mut values = self.storage.get_entries(&TOKEN_KEYS).into_iter();
        match (values.next().flatten(), values.next().flatten()) {
            (Some(identity), Some(refresh)) => Some(TokenPair::new(identity, refresh)),
            _ => None,
        }
    }

    /// Remove both tokens and end the session. Idempotent.
    pub fn clear(&self) {
        let _guard = lock(&self.writes);
        self.storage.remove_entries(&TOKEN_KEYS);
        self.session.send_replace(false);
        debug!("Cleared token pair");
    }


    /// Whether an operator session exists.
    pub fn is_logged_in(&self) -> bool {
        !self.auth_enabled || *self.session.borrow()
    }

    /// Whether tokens were stored, ignoring the disabled-auth bypass.
    pub fn has_session(&self) -> bool {
        *self.session.borrow()
    }

    /// Whether authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Receive session changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::InMemoryKeyValueStore;
    use std::time::Duration;

    fn store() -> (Arc<InMemoryKeyValueStore>, TokenStore<InMemoryKeyValueStore>) {
        let storage = Arc::new(InMemoryKeyValueStore::new());
        (storage.clone(), TokenStore::new(storage, true))
    }

    #[test]
    fn test_initially_logged_out() {
        let (_, store) = store();
        assert!(!store.is_logged_in());
        assert!(store.identity_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.tokens().is_none());
    }

    #[test]
    fn test_set_tokens() {
        let (storage, store) = store();
        store.set_tokens("id-1", "refresh-1");

        assert!(store.is_logged_in());
        assert_eq!(store.identity_token().as_deref(), Some("id-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
        assert_eq!(storage.get(ID_TOKEN_KEY).as_deref(), Some("id-1"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).as_deref(), Some("refresh-1"));

        let pair = store.tokens().unwrap();
        assert_eq!(pair.identity_token(), "id-1");
        assert_eq!(pair.refresh_token(), "refresh-1");
    }

    #[test]
    fn test_set_tokens_overwrites_both() {
        let (_, store) = store();
        store.set_tokens("id-1", "refresh-1");
        store.set_tokens("id-2", "refresh-2");

        let pair = store.tokens().unwrap();
        assert_eq!(pair.identity_token(), "id-2");
        assert_eq!(pair.refresh_token(), "refresh-2");
    }

    #[test]
    fn test_clear_ends_session() {
        let (storage, store) = store();
        store.set_tokens("id-1", "refresh-1");

        store.clear();
        assert!(!store.is_logged_in());
        assert!(store.identity_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(storage.is_empty());

        store.clear();
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_session_restored_from_storage() {
        let storage = Arc::new(InMemoryKeyValueStore::new());
        storage.set_entries(&[(ID_TOKEN_KEY, "persisted"), (REFRESH_TOKEN_KEY, "r")]);

        let store = TokenStore::new(storage, true);
        assert!(store.is_logged_in());
        assert!(store.has_session());
    }

    #[test]
    fn test_disabled_auth_reports_sentinel() {
        let storage = Arc::new(InMemoryKeyValueStore::new());
        let store = TokenStore::new(storage, false);

        assert!(store.is_logged_in());
        assert!(!store.has_session());
        assert_eq!(store.identity_token().as_deref(), Some(MOCKED_TOKEN));

        store.clear();
        assert!(store.is_logged_in());
        assert_eq!(store.identity_token().as_deref(), Some(MOCKED_TOKEN));
    }

    /// Store whose multi-key writes stall, widening the window between a
    /// write and the session flag update.
    struct SlowWriteStore {
        inner: InMemoryKeyValueStore,
        delay: Duration,
    }

    impl KeyValueStore for SlowWriteStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Option<String> {
            self.inner.remove(key)
        }

        fn get_entries(&self, keys: &[&str]) -> Vec<Option<String>> {
            self.inner.get_entries(keys)
        }

        fn set_entries(&self, entries: &[(&str, &str)]) {
            std::thread::sleep(self.delay);
            self.inner.set_entries(entries)
        }

        fn remove_entries(&self, keys: &[&str]) {
            self.inner.remove_entries(keys)
        }
    }

    #[test]
    fn test_clear_during_set_tokens_leaves_consistent_session() {
        let storage = Arc::new(SlowWriteStore {
            inner: InMemoryKeyValueStore::new(),
            delay: Duration::from_millis(100),
        });
        let store = Arc::new(TokenStore::new(storage, true));
        store.set_tokens("id-1", "refresh-1");

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || store.set_tokens("id-2", "refresh-2"))
        };
        std::thread::sleep(Duration::from_millis(30));
        let clearer = {
            let store = store.clone();
            std::thread::spawn(move || store.clear())
        };

        writer.join().unwrap();
        clearer.join().unwrap();

        let has_token = store.identity_token().is_some_and(|t| !t.is_empty());
        assert_eq!(store.is_logged_in(), has_token);
        assert!(!store.is_logged_in());
        assert!(store.refresh_token().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_notified() {
        let (_, store) = store();
        let mut session = store.subscribe();
        assert!(!*session.borrow_and_update());

        store.set_tokens("id-1", "refresh-1");
        session.changed().await.unwrap();
        assert!(*session.borrow_and_update());

        store.clear();
        session.changed().await.unwrap();
        assert!(!*session.borrow_and_update());
    }
}
