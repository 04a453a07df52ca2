//! Flat per-player records

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted player record.
///
/// Fields this server does not own (for example the password hash written
/// by the auth service) are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub username: String,
    #[serde(default)]
    pub exp: i32,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub troop_levels: HashMap<String, i32>,
    #[serde(default)]
    pub tower_levels: HashMap<String, i32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlayerRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            exp: 0,
            level: 0,
            troop_levels: HashMap::new(),
            tower_levels: HashMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Level of a troop, 1 when the record has never upgraded it
    pub fn troop_level(&self, name: &str) -> i32 {
        self.troop_levels.get(name).copied().unwrap_or(1)
    }

    /// Level of a tower, 1 when the record has never upgraded it
    pub fn tower_level(&self, name: &str) -> i32 {
        self.tower_levels.get(name).copied().unwrap_or(1)
    }
}

/// Player store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Player not found: {0}")]
    NotFound(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed player record: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load/save access to player records
pub trait PlayerStore: Send + Sync {
    fn load(&self, username: &str) -> Result<PlayerRecord, StoreError>;
    fn save(&self, record: &PlayerRecord) -> Result<(), StoreError>;
}

/// One pretty-printed `<username>.json` file per player
#[derive(Debug, Clone)]
pub struct JsonPlayerStore {
    dir: PathBuf,
}

impl JsonPlayerStore {
    /// Create the store, making sure the data directory exists
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}.json", username))
    }
}

impl PlayerStore for JsonPlayerStore {
    fn load(&self, username: &str) -> Result<PlayerRecord, StoreError> {
        let data = match fs::read(self.path_for(username)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(username.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(self.path_for(&record.username), json)?;
        debug!(username = %record.username, exp = record.exp, "Saved player record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (JsonPlayerStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("tower-clash-{}", uuid::Uuid::new_v4()));
        (JsonPlayerStore::open(&dir).unwrap(), dir)
    }

    #[test]
    fn missing_player_is_not_found() {
        let (store, dir) = temp_store();
        assert!(matches!(store.load("ghost"), Err(StoreError::NotFound(name)) if name == "ghost"));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn save_preserves_foreign_fields() {
        let (store, dir) = temp_store();
        fs::write(
            dir.join("alice.json"),
            r#"{"username":"alice","password_hash":"$2a$10$xyz","exp":12,"level":1,
                "troop_levels":{"Pawn":3},"tower_levels":{}}"#,
        )
        .unwrap();

        let mut record = store.load("alice").unwrap();
        assert_eq!(record.troop_level("Pawn"), 3);
        assert_eq!(record.troop_level("Rook"), 1);
        record.exp += 30;
        store.save(&record).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.join("alice.json")).unwrap()).unwrap();
        assert_eq!(raw["password_hash"], "$2a$10$xyz");
        assert_eq!(raw["exp"], 42);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn record_without_level_maps_loads_with_defaults() {
        let (store, dir) = temp_store();
        fs::write(dir.join("bob.json"), r#"{"username":"bob"}"#).unwrap();
        let record = store.load("bob").unwrap();
        assert_eq!(record.exp, 0);
        assert_eq!(record.tower_level("King Tower"), 1);
        fs::remove_dir_all(dir).ok();
    }
}
