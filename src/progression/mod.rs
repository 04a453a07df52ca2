//! Player progression: leveled unit stats and experience-paid upgrades

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::game::scaling::{scale, upgrade_cost};
use crate::store::{CatalogError, CatalogSource, PlayerRecord, PlayerStore, StoreError};

/// Progression errors
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Not enough EXP: have {have}, need {need}")]
    NotEnoughExp { have: i32, need: i32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// One unit as the player currently has it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitProgress {
    pub name: String,
    pub level: i32,
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
    pub upgrade_cost: i32,
    pub can_upgrade: bool,
}

impl UnitProgress {
    fn new(name: &str, level: i32, base: [i32; 3], base_exp: i32, exp: i32) -> Self {
        let cost = upgrade_cost(base_exp, level);
        Self {
            name: name.to_string(),
            level,
            hp: scale(base[0], level),
            atk: scale(base[1], level),
            def: scale(base[2], level),
            upgrade_cost: cost,
            can_upgrade: exp >= cost,
        }
    }
}

/// Player overview with every catalog unit at the player's level
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub username: String,
    pub exp: i32,
    pub level: i32,
    pub troops: Vec<UnitProgress>,
    pub towers: Vec<UnitProgress>,
}

/// Result of a successful upgrade
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeReceipt {
    pub name: String,
    pub level: i32,
    pub cost: i32,
    pub exp: i32,
}

/// Spend experience to raise one unit's level. Units never upgraded count as level 1.
fn spend_upgrade(
    exp: &mut i32,
    levels: &mut HashMap<String, i32>,
    name: &str,
    base_exp: i32,
) -> Result<UpgradeReceipt, ProgressionError> {
    let current = levels.get(name).copied().unwrap_or(1);
    let cost = upgrade_cost(base_exp, current);
    if *exp < cost {
        return Err(ProgressionError::NotEnoughExp {
            have: *exp,
            need: cost,
        });
    }

    *exp -= cost;
    levels.insert(name.to_string(), current + 1);

    Ok(UpgradeReceipt {
        name: name.to_string(),
        level: current + 1,
        cost,
        exp: *exp,
    })
}

/// Which kind of unit an upgrade targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Troop,
    Tower,
}

/// Profile and upgrade operations over the player store
#[derive(Clone)]
pub struct ProgressionService {
    store: Arc<dyn PlayerStore>,
    catalog: Arc<dyn CatalogSource>,
}

impl ProgressionService {
    pub fn new(store: Arc<dyn PlayerStore>, catalog: Arc<dyn CatalogSource>) -> Self {
        Self { store, catalog }
    }

    pub fn profile(&self, username: &str) -> Result<Profile, ProgressionError> {
        let record = self.store.load(username)?;
        let troops = self.catalog.load_troops()?;
        let towers = self.catalog.load_towers()?;

        let troops = troops
            .iter()
            .map(|t| {
                UnitProgress::new(
                    &t.name,
                    record.troop_level(&t.name),
                    [t.hp, t.attack, t.defense],
                    t.exp_value,
                    record.exp,
                )
            })
            .collect();

        // Towers share levels by name, so list each name once
        let mut seen = HashSet::new();
        let towers = towers
            .iter()
            .filter(|t| seen.insert(t.name.clone()))
            .map(|t| {
                UnitProgress::new(
                    &t.name,
                    record.tower_level(&t.name),
                    [t.hp, t.attack, t.defense],
                    t.exp_value,
                    record.exp,
                )
            })
            .collect();

        Ok(Profile {
            username: record.username,
            exp: record.exp,
            level: record.level,
            troops,
            towers,
        })
    }

    /// Upgrade a troop or tower by name and persist the record
    pub fn upgrade(
        &self,
        username: &str,
        kind: UnitKind,
        name: &str,
    ) -> Result<UpgradeReceipt, ProgressionError> {
        let mut record = self.store.load(username)?;
        let receipt = match kind {
            UnitKind::Troop => {
                let base_exp = self
                    .catalog
                    .load_troops()?
                    .into_iter()
                    .find(|t| t.name == name)
                    .map(|t| t.exp_value)
                    .ok_or_else(|| ProgressionError::UnknownUnit(name.to_string()))?;
                let PlayerRecord {
                    exp, troop_levels, ..
                } = &mut record;
                spend_upgrade(exp, troop_levels, name, base_exp)?
            }
            UnitKind::Tower => {
                let base_exp = self
                    .catalog
                    .load_towers()?
                    .into_iter()
                    .find(|t| t.name == name)
                    .map(|t| t.exp_value)
                    .ok_or_else(|| ProgressionError::UnknownUnit(name.to_string()))?;
                let PlayerRecord {
                    exp, tower_levels, ..
                } = &mut record;
                spend_upgrade(exp, tower_levels, name, base_exp)?
            }
        };

        self.store.save(&record)?;
        info!(username, unit = %receipt.name, level = receipt.level, cost = receipt.cost, "Unit upgraded");
        Ok(receipt)
    }
}
