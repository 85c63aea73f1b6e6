//! Durable persistence for [`SessionState`].
//!
//! The store is the only writer of the session entry. Loading is defensive:
//! a missing, empty, corrupt, or wrong-version entry degrades to the empty
//! state with a warning rather than an error. A session that fails to load
//! just has to be paired again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::Storage;

use super::types::SessionState;

/// Fixed storage key for the persisted session entry.
const SESSION_STATE_KEY: &str = "relay-session";

/// Schema version of the persisted envelope. Entries with any other version
/// are discarded on load.
const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreEnvelope {
    version: u32,
    session: SessionState,
}

/// Reads and writes the one persisted [`SessionState`] entry.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        SessionStore { storage }
    }

    /// Rehydrates the persisted session, or the empty state when nothing
    /// usable is stored. Never fails.
    pub fn load(&self) -> SessionState {
        let Some(raw) = self.storage.get(SESSION_STATE_KEY) else {
            return SessionState::default();
        };

        if raw.trim().is_empty() {
            warn!("Empty session entry in storage, starting disconnected");
            return SessionState::default();
        }

        match serde_json::from_str::<StoreEnvelope>(&raw) {
            Ok(envelope) if envelope.version == STORE_VERSION => envelope.session,
            Ok(envelope) => {
                warn!(
                    version = envelope.version,
                    expected = STORE_VERSION,
                    "Unsupported session entry version, starting disconnected"
                );
                SessionState::default()
            }
            Err(err) => {
                warn!(error = %err, "Failed to parse session entry, starting disconnected");
                SessionState::default()
            }
        }
    }

    /// Persists the state when it is persist-worthy (a pairing artifact is
    /// present or the session is connected). A fully-empty state writes
    /// nothing.
    pub fn save(&self, state: &SessionState) -> Result<(), String> {
        if !state.should_persist() {
            return Ok(());
        }

        let envelope = StoreEnvelope {
            version: STORE_VERSION,
            session: state.clone(),
        };
        let payload = serde_json::to_string_pretty(&envelope)
            .map_err(|err| format!("Failed to serialize session entry: {}", err))?;
        self.storage.set(SESSION_STATE_KEY, &payload)
    }

    /// Removes the persisted entry. Idempotent.
    pub fn clear(&self) -> Result<(), String> {
        self.storage.remove(SESSION_STATE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Utc;

    fn store_with_memory() -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (SessionStore::new(storage.clone()), storage)
    }

    fn connected_state() -> SessionState {
        SessionState {
            session_id: "s1".to_string(),
            pairing_artifact: String::new(),
            is_connected: true,
            bound_identifier: "+5511999999999".to_string(),
            last_connected_at: Some(Utc::now()),
            is_generating: false,
        }
    }

    #[test]
    fn test_load_without_entry_returns_empty_state() {
        let (store, _) = store_with_memory();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_persistence_round_trip() {
        let (store, _) = store_with_memory();
        let state = connected_state();
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_pending_pairing_round_trips() {
        let (store, _) = store_with_memory();
        let state = SessionState {
            session_id: "s2".to_string(),
            pairing_artifact: "https://example.invalid/code".to_string(),
            ..SessionState::default()
        };
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_empty_state_writes_no_entry() {
        let (store, storage) = store_with_memory();
        store.save(&SessionState::default()).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_clear_removes_entry_and_is_idempotent() {
        let (store, storage) = store_with_memory();
        store.save(&connected_state()).unwrap();
        store.clear().unwrap();
        assert!(storage.is_empty());
        store.clear().unwrap();
    }

    #[test]
    fn test_load_corrupt_entry_returns_empty_state() {
        let (store, storage) = store_with_memory();
        storage.set(SESSION_STATE_KEY, "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_blank_entry_returns_empty_state() {
        let (store, storage) = store_with_memory();
        storage.set(SESSION_STATE_KEY, "   ").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_unsupported_version_returns_empty_state() {
        let (store, storage) = store_with_memory();
        storage
            .set(
                SESSION_STATE_KEY,
                r#"{"version":99,"session":{"session_id":"s1"}}"#,
            )
            .unwrap();
        assert!(store.load().is_empty());
    }
}
