#![deny(warnings)]

//! Persistence layer: key-value stores and game snapshots.
//!
//! Saving and loading never interrupt play. Failures are logged and reported
//! as `false`/`None`; callers fall back to a fresh game.

use oil_core::PlayerState;
use oil_goals::{AchievementBook, GameOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Key used when the host does not pick one.
pub const DEFAULT_SAVE_KEY: &str = "oil_empire_save";

/// Current snapshot layout version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

/// Minimal string key-value capability.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn put(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistError>;
}

/// Volatile store for tests and headless runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serializable projection of a game. Missing keys fall back to defaults, so
/// saves written before a field existed still load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSnapshot {
    pub format_version: u32,
    pub state: PlayerState,
    pub achievements: AchievementBook,
    pub outcome: GameOutcome,
}

impl PersistedSnapshot {
    pub fn new(state: PlayerState, achievements: AchievementBook, outcome: GameOutcome) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            state,
            achievements,
            outcome,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Write a snapshot. Returns false (after logging) on failure.
pub fn save_snapshot(
    store: &mut dyn KeyValueStore,
    key: &str,
    snapshot: &PersistedSnapshot,
) -> bool {
    let result = snapshot.to_json().and_then(|json| store.put(key, &json));
    match result {
        Ok(()) => {
            debug!(key, "game saved");
            true
        }
        Err(e) => {
            warn!(key, error = %e, "failed to save game");
            false
        }
    }
}

/// Read a snapshot. Missing, unreadable or corrupt saves yield `None`.
pub fn load_snapshot(store: &dyn KeyValueStore, key: &str) -> Option<PersistedSnapshot> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "failed to read save");
            return None;
        }
    };
    match PersistedSnapshot::from_json(&raw) {
        Ok(snapshot) => {
            if snapshot.format_version > FORMAT_VERSION {
                warn!(
                    key,
                    version = snapshot.format_version,
                    "save was written by a newer version; loading known fields only"
                );
            }
            Some(snapshot)
        }
        Err(e) => {
            warn!(key, error = %e, "corrupt save ignored");
            None
        }
    }
}

/// Delete a save. Returns false (after logging) on failure.
pub fn clear_snapshot(store: &mut dyn KeyValueStore, key: &str) -> bool {
    match store.remove(key) {
        Ok(()) => true,
        Err(e) => {
            warn!(key, error = %e, "failed to clear save");
            false
        }
    }
}
