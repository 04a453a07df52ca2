//! Shared fixtures for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::game::{GameSession, GameSettings};
use crate::matchmaking::MatchmakingService;
use crate::store::{
    CatalogError, CatalogSource, PlayerRecord, PlayerStore, StoreError, TowerDef, TroopDef,
};

/// Player store kept in memory, counting saves
#[derive(Default)]
pub struct MemoryPlayerStore {
    records: Mutex<HashMap<String, PlayerRecord>>,
    saves: AtomicUsize,
}

impl MemoryPlayerStore {
    pub fn with_players(names: &[&str]) -> Self {
        let store = Self::default();
        for name in names {
            store.insert(PlayerRecord::new(*name));
        }
        store
    }

    pub fn insert(&self, record: PlayerRecord) {
        self.records.lock().insert(record.username.clone(), record);
    }

    pub fn remove(&self, username: &str) {
        self.records.lock().remove(username);
    }

    pub fn get(&self, username: &str) -> Option<PlayerRecord> {
        self.records.lock().get(username).cloned()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn load(&self, username: &str) -> Result<PlayerRecord, StoreError> {
        self.get(username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }

    fn save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(record.clone());
        Ok(())
    }
}

pub fn sample_troops() -> Vec<TroopDef> {
    let troop = |name: &str, hp, attack, defense, cost, exp_value| TroopDef {
        name: name.to_string(),
        hp,
        attack,
        defense,
        cost,
        exp_value,
        special: String::new(),
    };

    vec![
        troop("Pawn", 50, 150, 100, 3, 5),
        troop("Bishop", 100, 200, 150, 4, 10),
        troop("Rook", 250, 200, 200, 5, 25),
        troop("Knight", 200, 300, 150, 5, 25),
        troop("Prince", 500, 400, 300, 6, 50),
    ]
}

/// Two guards and a king, none of which ever crit
pub fn sample_towers() -> Vec<TowerDef> {
    let tower = |name: &str, hp, attack, defense| TowerDef {
        name: name.to_string(),
        hp,
        attack,
        defense,
        critical_chance: 0.0,
        exp_value: 100,
        role: None,
    };

    vec![
        tower("Guard Tower", 1000, 300, 100),
        tower("Guard Tower", 1000, 300, 100),
        tower("King Tower", 2000, 500, 300),
    ]
}

/// Catalog served from memory
pub struct StaticCatalog {
    pub troops: Vec<TroopDef>,
    pub towers: Vec<TowerDef>,
}

impl StaticCatalog {
    pub fn sample() -> Self {
        Self {
            troops: sample_troops(),
            towers: sample_towers(),
        }
    }
}

impl CatalogSource for StaticCatalog {
    fn load_troops(&self) -> Result<Vec<TroopDef>, CatalogError> {
        Ok(self.troops.clone())
    }

    fn load_towers(&self) -> Result<Vec<TowerDef>, CatalogError> {
        Ok(self.towers.clone())
    }
}

/// Pair alice and bob and build their session without starting its timer
pub fn alice_vs_bob(store: Arc<MemoryPlayerStore>, settings: GameSettings) -> Arc<GameSession> {
    let lobby = Arc::new(MatchmakingService::new());
    lobby.join("alice");
    let id = lobby.join("bob").expect("second join pairs");

    let records = [
        store.get("alice").expect("alice exists"),
        store.get("bob").expect("bob exists"),
    ];
    Arc::new(GameSession::new(
        id,
        records,
        sample_troops(),
        &sample_towers(),
        settings,
        store,
        lobby,
    ))
}
