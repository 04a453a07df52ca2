//! Live game session: mana economy, hands, deploy/combat and termination

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::matchmaking::{MatchmakingService, SessionId};
use crate::store::{CatalogError, PlayerRecord, PlayerStore, StoreError, TowerDef, TroopDef};

use super::combat;
use super::events::{spawn_event_timer, RandomEvent};
use super::snapshot::SessionSnapshot;
use super::units::{Tower, Troop};

/// Mana each player starts with
pub const STARTING_MANA: i32 = 5;
/// Mana ceiling
pub const MAX_MANA: i32 = 10;
/// Cards dealt at the start of a session
pub const HAND_SIZE: usize = 4;
/// Experience for winning
pub const WIN_EXP: i32 = 30;
/// Experience for each player on a draw
pub const DRAW_EXP: i32 = 10;

/// Tunables shared by every session
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// How long a session runs before it is decided on towers
    pub duration: Duration,
    /// Critical-hit chance for deployed troops
    pub critical_chance: f64,
    /// Period of the random event timer
    pub event_interval: Duration,
    /// How long a finished session stays readable
    pub finished_retention: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(180),
            critical_chance: 0.10,
            event_interval: Duration::from_secs(30),
            finished_retention: Duration::from_secs(60),
        }
    }
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("game already finished")]
    AlreadyFinished,

    #[error("game time is up")]
    TimeExpired,

    #[error("troop not found in hand: {0}")]
    TroopNotInHand(String),

    #[error("not enough mana: have {have}, need {need}")]
    InsufficientMana { have: i32, need: i32 },

    #[error("{0} is not a player in this session")]
    NotInSession(String),

    #[error("session {0} is not ready")]
    PairingNotReady(SessionId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// How a session was decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Winner(String),
    Draw,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Winner(username) => f.write_str(username),
            Outcome::Draw => f.write_str("Draw"),
        }
    }
}

/// One side of the board
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub record: PlayerRecord,
    pub mana: i32,
    pub last_regen: Instant,
    pub hand: Vec<Troop>,
    pub towers: Vec<Tower>,
}

impl PlayerSlot {
    fn new(record: PlayerRecord, tower_defs: &[TowerDef], now: Instant) -> Self {
        let towers = tower_defs
            .iter()
            .map(|def| Tower::leveled(def, record.tower_level(&def.name)))
            .collect();

        Self {
            record,
            mana: STARTING_MANA,
            last_regen: now,
            hand: Vec::with_capacity(HAND_SIZE),
            towers,
        }
    }

    pub fn username(&self) -> &str {
        &self.record.username
    }

    fn surviving_towers(&self) -> usize {
        self.towers.iter().filter(|t| t.is_alive()).count()
    }

    /// Whole seconds since the last regen become mana; a partial second
    /// leaves the timestamp where it was
    fn regen(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_regen).as_secs();
        if elapsed >= 1 {
            let gained = elapsed.min(MAX_MANA as u64) as i32;
            self.mana = (self.mana + gained).min(MAX_MANA);
            self.last_regen = now;
        }
    }

    /// Remove the first troop with this exact name
    fn take_from_hand(&mut self, name: &str) -> Option<Troop> {
        let pos = self.hand.iter().position(|t| t.name == name)?;
        Some(self.hand.remove(pos))
    }
}

/// Mutable session state, only touched under the session lock
#[derive(Debug)]
pub struct SessionState {
    pub players: [PlayerSlot; 2],
    /// The session's private copy of the troop catalog, reshuffled per draw
    pub troop_catalog: Vec<TroopDef>,
    pub started_at: Instant,
    pub duration: Duration,
    pub critical_chance: f64,
    pub finished: bool,
    pub finished_at: Option<Instant>,
    pub outcome: Option<Outcome>,
    pub battle_log: Vec<String>,
    rng: ChaCha8Rng,
}

impl SessionState {
    pub fn index_of(&self, username: &str) -> Option<usize> {
        self.players.iter().position(|p| p.username() == username)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) > self.duration
    }

    /// Deal `count` freshly shuffled, leveled troops into a player's hand
    fn draw(&mut self, idx: usize, count: usize) {
        let mut deck = self.troop_catalog.clone();
        deck.shuffle(&mut self.rng);

        let player = &mut self.players[idx];
        for def in deck.iter().take(count) {
            let level = player.record.troop_level(&def.name);
            player.hand.push(Troop::leveled(def, level));
        }
    }

    fn log(&mut self, entry: String) {
        self.battle_log.push(entry);
    }
}

/// More surviving towers wins; equal counts are a draw
fn decide_on_towers(players: &[PlayerSlot; 2]) -> Outcome {
    match players[0].surviving_towers().cmp(&players[1].surviving_towers()) {
        Ordering::Greater => Outcome::Winner(players[0].username().to_string()),
        Ordering::Less => Outcome::Winner(players[1].username().to_string()),
        Ordering::Equal => Outcome::Draw,
    }
}

/// A live match between two players
pub struct GameSession {
    id: SessionId,
    state: Mutex<SessionState>,
    settings: GameSettings,
    store: Arc<dyn PlayerStore>,
    lobby: Arc<MatchmakingService>,
    events_task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession").field("id", &self.id).finish_non_exhaustive()
    }
}

impl GameSession {
    /// Set up a session: level and clone both players' towers, deal hands.
    /// The event timer is not running until [`GameSession::start_events`].
    pub fn new(
        id: SessionId,
        records: [PlayerRecord; 2],
        troop_catalog: Vec<TroopDef>,
        tower_catalog: &[TowerDef],
        settings: GameSettings,
        store: Arc<dyn PlayerStore>,
        lobby: Arc<MatchmakingService>,
    ) -> Self {
        let now = Instant::now();
        let [first, second] = records;

        let mut state = SessionState {
            players: [
                PlayerSlot::new(first, tower_catalog, now),
                PlayerSlot::new(second, tower_catalog, now),
            ],
            troop_catalog,
            started_at: now,
            duration: settings.duration,
            critical_chance: settings.critical_chance,
            finished: false,
            finished_at: None,
            outcome: None,
            battle_log: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(rand::random()),
        };
        state.draw(0, HAND_SIZE);
        state.draw(1, HAND_SIZE);

        info!(
            session_id = %id,
            player_one = %state.players[0].username(),
            player_two = %state.players[1].username(),
            "Session created"
        );

        Self {
            id,
            state: Mutex::new(state),
            settings,
            store,
            lobby,
            events_task: Mutex::new(None),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Start the random event timer. Needs a tokio runtime.
    pub fn start_events(self: &Arc<Self>) {
        let handle = spawn_event_timer(self, self.settings.event_interval);
        *self.events_task.lock() = Some(handle);
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.state.lock().finished_at
    }

    /// Play a troop from hand and fight it out against the enemy's towers
    pub fn deploy(&self, username: &str, troop_name: &str) -> Result<(), SessionError> {
        self.deploy_at(username, troop_name, Instant::now())
    }

    fn deploy_at(
        &self,
        username: &str,
        troop_name: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock();

        let idx = state
            .index_of(username)
            .ok_or_else(|| SessionError::NotInSession(username.to_string()))?;

        if state.finished {
            return Err(SessionError::AlreadyFinished);
        }

        if state.is_expired(now) {
            self.finish_locked(&mut state, now);
            return Err(SessionError::TimeExpired);
        }

        state.players[idx].regen(now);

        let mut troop = state.players[idx]
            .take_from_hand(troop_name)
            .ok_or_else(|| SessionError::TroopNotInHand(troop_name.to_string()))?;

        // The card is spent and replaced even if the mana check below fails
        state.draw(idx, 1);

        let mana = state.players[idx].mana;
        if mana < troop.cost {
            debug!(session_id = %self.id, username, troop = %troop.name, mana, "Deploy without enough mana");
            return Err(SessionError::InsufficientMana {
                have: mana,
                need: troop.cost,
            });
        }
        state.players[idx].mana -= troop.cost;

        let enemy = 1 - idx;
        let Some(target) = combat::select_target(&state.players[enemy].towers) else {
            state.outcome = Some(Outcome::Winner(username.to_string()));
            self.finish_locked(&mut state, now);
            return Ok(());
        };

        let outcome = {
            let SessionState {
                players,
                rng,
                battle_log,
                critical_chance,
                ..
            } = &mut *state;

            combat::resolve(
                rng,
                username,
                &mut troop,
                *critical_chance,
                &mut players[enemy].towers[target],
                battle_log,
            )
        };
        debug!(session_id = %self.id, username, troop = %troop.name, ?outcome, "Combat resolved");

        if state.players[enemy].surviving_towers() == 0 {
            state.outcome = Some(Outcome::Winner(username.to_string()));
            self.finish_locked(&mut state, now);
        } else {
            // The fight itself takes time, so check the clock again
            let after = Instant::now().max(now);
            if state.is_expired(after) {
                self.finish_locked(&mut state, after);
            }
        }

        Ok(())
    }

    /// Read the session for one player: regenerates their mana and ends the
    /// game if its time is up, then projects the state
    pub fn poll(&self, username: &str) -> Result<SessionSnapshot, SessionError> {
        self.poll_at(username, Instant::now())
    }

    fn poll_at(&self, username: &str, now: Instant) -> Result<SessionSnapshot, SessionError> {
        let mut state = self.state.lock();

        let idx = state
            .index_of(username)
            .ok_or_else(|| SessionError::NotInSession(username.to_string()))?;

        state.players[idx].regen(now);
        if state.is_expired(now) && !state.finished {
            self.finish_locked(&mut state, now);
        }

        Ok(SessionSnapshot::project(&state, idx, now))
    }

    /// Apply one random event. Returns `None` once the session is finished,
    /// finishing it first if its time ran out with nobody watching.
    pub fn fire_random_event(&self) -> Option<RandomEvent> {
        let mut state = self.state.lock();
        if state.finished {
            return None;
        }

        let now = Instant::now();
        if state.is_expired(now) {
            self.finish_locked(&mut state, now);
            return None;
        }

        let event = RandomEvent::pick(&mut state.rng);
        self.apply_event_locked(&mut state, event);
        Some(event)
    }

    fn apply_event_locked(&self, state: &mut SessionState, event: RandomEvent) {
        let line = event.apply(&mut state.players);
        info!(session_id = %self.id, ?event, "Random event");
        state.log(line);
    }

    /// Finish the session if its time is up at `now`.
    /// Returns whether this call finished it.
    pub fn finish_if_expired(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        if state.finished || !state.is_expired(now) {
            return false;
        }
        self.finish_locked(&mut state, now);
        true
    }

    /// End the session, decide the winner and pay out experience.
    /// Calling it again is a no-op.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        self.finish_locked(&mut state, Instant::now());
    }

    fn finish_locked(&self, state: &mut SessionState, now: Instant) {
        if state.finished {
            return;
        }
        state.finished = true;
        state.finished_at = Some(now);

        let outcome = match state.outcome.clone() {
            Some(outcome) => outcome,
            None => {
                let outcome = decide_on_towers(&state.players);
                state.outcome = Some(outcome.clone());
                outcome
            }
        };

        for player in state.players.iter_mut() {
            let award = match &outcome {
                Outcome::Winner(name) if name == player.username() => WIN_EXP,
                Outcome::Winner(_) => 0,
                Outcome::Draw => DRAW_EXP,
            };
            player.record.exp += award;
        }

        state.log(format!("Game Over! Winner: {}", outcome));

        for player in &state.players {
            self.persist(&player.record);
        }

        self.lobby.remove_session(&self.id);
        if let Some(handle) = self.events_task.lock().take() {
            handle.abort();
        }

        info!(session_id = %self.id, outcome = %outcome, "Session finished");
    }

    /// Write a finished player's progress back over their stored record.
    /// There is no way to recover a decided game whose reward cannot be
    /// saved, so failures here abort the caller.
    fn persist(&self, record: &PlayerRecord) {
        let mut stored = self.store.load(&record.username).unwrap_or_else(|e| {
            error!(session_id = %self.id, username = %record.username, error = %e, "Failed to reload player record");
            panic!("cannot reload player record for {}: {}", record.username, e)
        });

        stored.exp = record.exp;
        stored.level = record.level;
        stored.troop_levels = record.troop_levels.clone();
        stored.tower_levels = record.tower_levels.clone();

        if let Err(e) = self.store.save(&stored) {
            error!(session_id = %self.id, username = %record.username, error = %e, "Failed to save player record");
            panic!("cannot save player record for {}: {}", record.username, e);
        }
    }
}
