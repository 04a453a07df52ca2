//! Player-scoped, read-only views of a session for clients

use std::time::Instant;

use serde::Serialize;

use super::session::SessionState;
use super::units::{Tower, Troop};

/// A card in the viewer's hand. HP is left out since it only matters once deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TroopView {
    pub name: String,
    pub cost: i32,
    pub atk: i32,
    pub def: i32,
}

impl From<&Troop> for TroopView {
    fn from(troop: &Troop) -> Self {
        Self {
            name: troop.name.clone(),
            cost: troop.cost,
            atk: troop.attack,
            def: troop.defense,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TowerView {
    pub name: String,
    pub hp: i32,
}

impl From<&Tower> for TowerView {
    fn from(tower: &Tower) -> Self {
        Self {
            name: tower.name.clone(),
            hp: tower.hp,
        }
    }
}

/// What one player sees of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub your_mana: i32,
    pub your_hand: Vec<TroopView>,
    /// `[yours, opponent's]`
    pub towers: [Vec<TowerView>; 2],
    /// Whole seconds remaining, never negative
    pub time_left: u64,
    pub finished: bool,
    /// Username, "Draw", or empty while undecided
    pub winner: String,
    pub battle_log: Vec<String>,
}

fn tower_views(towers: &[Tower]) -> Vec<TowerView> {
    towers.iter().map(TowerView::from).collect()
}

impl SessionSnapshot {
    /// Project `state` for the player in slot `viewer`
    pub fn project(state: &SessionState, viewer: usize, now: Instant) -> Self {
        let you = &state.players[viewer];
        let opponent = &state.players[1 - viewer];

        let elapsed = now.saturating_duration_since(state.started_at);
        let time_left = state.duration.saturating_sub(elapsed).as_secs();

        Self {
            your_mana: you.mana,
            your_hand: you.hand.iter().map(TroopView::from).collect(),
            towers: [tower_views(&you.towers), tower_views(&opponent.towers)],
            time_left,
            finished: state.finished,
            winner: state
                .outcome
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            battle_log: state.battle_log.clone(),
        }
    }
}
