use std::cell::RefCell;
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use tsugihagi_core::{decode, encode, PocketSaveState, POCKET_SAVE_VERSION};

/// The load/save contract this core consumes. Values are opaque
/// strings so any string-keyed store (browser storage, a settings db,
/// a file per key) can satisfy it.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage write failed: {0}")]
    Write(String),
}

/// In-memory store; the default for tests and headless sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

pub fn pocket_save_key(level: &str) -> String {
    format!("tsugihagi.pockets.{level}.v1")
}

/// Persists the three-pocket snapshot. Storage failures are logged and
/// swallowed; the in-memory state stays authoritative.
pub fn save_pockets(store: &dyn KeyValueStore, key: &str, state: &PocketSaveState) {
    let Some(bytes) = encode(state) else {
        log::warn!("pocket save: encode failed for {key}");
        return;
    };
    let raw = STANDARD.encode(bytes);
    if let Err(err) = store.set(key, &raw) {
        log::warn!("pocket save: {err} for {key}");
    }
}

/// Loads a pocket snapshot; any missing, corrupt or version-mismatched
/// payload yields `None`.
pub fn load_pockets(store: &dyn KeyValueStore, key: &str) -> Option<PocketSaveState> {
    let raw = store.get(key)?;
    if raw.is_empty() {
        return None;
    }
    let bytes = STANDARD.decode(raw.as_bytes()).ok()?;
    let state = decode::<PocketSaveState>(&bytes)?;
    if state.version != POCKET_SAVE_VERSION {
        log::warn!(
            "pocket save: version mismatch ({} != {POCKET_SAVE_VERSION}) for {key}",
            state.version
        );
        return None;
    }
    Some(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsugihagi_core::PocketPieceRecord;

    #[test]
    fn save_then_load_round_trips() {
        let store = MemoryStore::new();
        let key = pocket_save_key("level-1");
        let mut state = PocketSaveState::empty();
        state.pockets[0].pieces.push(PocketPieceRecord {
            piece_id: 3,
            angle: 180.0,
            slot_index: 0,
            last_world_pos: Some((40.0, 60.0)),
        });
        save_pockets(&store, &key, &state);
        assert_eq!(load_pockets(&store, &key), Some(state));
    }

    #[test]
    fn corrupt_payload_loads_as_none() {
        let store = MemoryStore::new();
        store.set("k", "definitely not base64 rkyv!").unwrap();
        assert_eq!(load_pockets(&store, "k"), None);
    }

    #[test]
    fn version_mismatch_is_discarded() {
        let store = MemoryStore::new();
        let mut state = PocketSaveState::empty();
        state.version = POCKET_SAVE_VERSION + 1;
        save_pockets(&store, "k", &state);
        assert_eq!(load_pockets(&store, "k"), None);
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(load_pockets(&store, "absent"), None);
    }
}
