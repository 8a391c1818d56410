//! State Management
//!
//! CSRF state parameter generation and validation.

use rand::RngCore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::lock;
use crate::core::storage::KeyValueStore;

/// Storage key of the pending CSRF state.
pub const STATE_KEY: &str = "state";

/// Number of random bytes in a state value.
pub const STATE_BYTES: usize = 32;

/// State manager interface (for dependency injection).
pub trait StateManager: Send + Sync {
    /// Generate a new state, persist it and return it.
    fn create_and_store(&self) -> String;

    /// Validate a received state and consume the stored one.
    ///
    /// The stored value is deleted whether or not validation succeeds.
    fn validate_and_consume(&self, received: Option<&str>) -> bool;
}

/// State manager persisting the pending state in a key-value store.
///
/// Only one login can be pending; creating a new state replaces the old one.
pub struct StorageStateManager<K: KeyValueStore> {
    storage: Arc<K>,
}

impl<K: KeyValueStore> StorageStateManager<K> {
    /// Create new state manager.
    pub fn new(storage: Arc<K>) -> Self {
        Self { storage }
    }

    fn generate_random_state() -> String {
        let mut bytes = [0u8; STATE_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

impl<K: KeyValueStore> StateManager for StorageStateManager<K> {
    fn create_and_store(&self) -> String {
        let state = Self::generate_random_state();
        self.storage.set(STATE_KEY, &state);
        state
    }

    fn validate_and_consume(&self, received: Option<&str>) -> bool {
        let stored = self.storage.remove(STATE_KEY);

        match (stored, received) {
            (Some(stored), Some(received)) => !received.is_empty() && stored == received,
            _ => false,
        }
    }
}

/// Mock state manager for testing.
#[derive(Default)]
pub struct MockStateManager {
    stored: Mutex<Option<String>>,
    next_states: Mutex<VecDeque<String>>,
    consume_history: Mutex<Vec<Option<String>>>,
}

impl MockStateManager {
    /// Create new mock state manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the next state to generate.
    pub fn set_next_state(&self, state: impl Into<String>) -> &Self {
        lock(&self.next_states).push_back(state.into());
        self
    }

    /// Pre-populate the stored state.
    pub fn set_stored_state(&self, state: impl Into<String>) -> &Self {
        *lock(&self.stored) = Some(state.into());
        self
    }

    /// Currently stored state.
    pub fn stored_state(&self) -> Option<String> {
        lock(&self.stored).clone()
    }

    /// Get consume history.
    pub fn get_consume_history(&self) -> Vec<Option<String>> {
        lock(&self.consume_history).clone()
    }
}

impl StateManager for MockStateManager {
    fn create_and_store(&self) -> String {
        let state = lock(&self.next_states)
            .pop_front()
            .unwrap_or_else(|| format!("mock-state-{}", rand::random::<u32>()));
        *lock(&self.stored) = Some(state.clone());
        state
    }

    fn validate_and_consume(&self, received: Option<&str>) -> bool {
        lock(&self.consume_history).push(received.map(str::to_string));
        let stored = lock(&self.stored).take();
        matches!((stored, received), (Some(s), Some(r)) if !r.is_empty() && s == r)
    }
}

/// Create a state manager backed by the given storage.
pub fn create_state_manager<K: KeyValueStore>(storage: Arc<K>) -> StorageStateManager<K> {
    StorageStateManager::new(storage)
}

/// Create mock state manager for testing.
pub fn create_mock_state_manager() -> MockStateManager {
    MockStateManager::new()
}
