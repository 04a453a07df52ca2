//! Session-local troop and tower instances

use crate::store::{TowerDef, TowerRole, TroopDef};

use super::scaling::scale;

/// A troop in a player's hand, leveled and owned by the session
#[derive(Debug, Clone, PartialEq)]
pub struct Troop {
    pub name: String,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub cost: i32,
}

impl Troop {
    /// Clone a catalog entry and apply the player's level to it
    pub fn leveled(def: &TroopDef, level: i32) -> Self {
        Self {
            name: def.name.clone(),
            hp: scale(def.hp, level),
            attack: scale(def.attack, level),
            defense: scale(def.defense, level),
            cost: def.cost,
        }
    }
}

/// A tower on the board. HP may go negative through random events;
/// anything at or below zero counts as destroyed.
#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    pub name: String,
    pub role: TowerRole,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub critical_chance: f64,
}

impl Tower {
    pub fn leveled(def: &TowerDef, level: i32) -> Self {
        Self {
            name: def.name.clone(),
            role: def.role(),
            hp: scale(def.hp, level),
            attack: scale(def.attack, level),
            defense: scale(def.defense, level),
            critical_chance: def.critical_chance,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}
