//! Matchmaking service - owns the queue and the session pairings

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::queue::{MatchmakingQueue, QueuedPlayer};

/// Identifier of a paired session
pub type SessionId = Uuid;

#[derive(Debug, Default)]
struct LobbyState {
    queue: MatchmakingQueue,
    /// Session -> its two players, in slot order
    pairings: HashMap<SessionId, [String; 2]>,
}

impl LobbyState {
    fn session_of(&self, username: &str) -> Option<SessionId> {
        self.pairings
            .iter()
            .find(|(_, players)| players.iter().any(|p| p == username))
            .map(|(id, _)| *id)
    }
}

/// Matchmaking service.
///
/// A single lock guards both the queue and the pairing map so a username is
/// never queued and paired at once, nor paired twice.
#[derive(Debug, Default)]
pub struct MatchmakingService {
    state: Mutex<LobbyState>,
}

impl MatchmakingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join matchmaking.
    ///
    /// Returns the player's session if they already have one, or the new
    /// session if this join completed a pair. Returns `None` while waiting.
    pub fn join(&self, username: &str) -> Option<SessionId> {
        let mut state = self.state.lock();

        if let Some(id) = state.session_of(username) {
            debug!(username, session_id = %id, "Player rejoined existing session");
            return Some(id);
        }

        if !state.queue.enqueue(QueuedPlayer::new(username)) {
            return None;
        }
        info!(username, queue_size = state.queue.len(), "Player joined matchmaking queue");

        let (first, second) = state.queue.try_pair()?;
        let id = Uuid::new_v4();
        info!(
            session_id = %id,
            player_one = %first.username,
            player_two = %second.username,
            longest_wait_ms = first.wait_time().as_millis() as u64,
            "Paired players into new session"
        );
        state.pairings.insert(id, [first.username, second.username]);

        Some(id)
    }

    /// Leave the queue. Has no effect once paired.
    pub fn leave(&self, username: &str) -> bool {
        let removed = self.state.lock().queue.dequeue(username).is_some();
        if removed {
            info!(username, "Player left matchmaking queue");
        }
        removed
    }

    /// Get a player's current session
    pub fn session_for(&self, username: &str) -> Option<SessionId> {
        self.state.lock().session_of(username)
    }

    /// Get the two players of a session
    pub fn players(&self, id: &SessionId) -> Option<[String; 2]> {
        self.state.lock().pairings.get(id).cloned()
    }

    /// Get current queue size
    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of live pairings
    pub fn active_sessions(&self) -> usize {
        self.state.lock().pairings.len()
    }

    /// Forget a session's pairing. Safe to call more than once.
    pub fn remove_session(&self, id: &SessionId) {
        if self.state.lock().pairings.remove(id).is_some() {
            info!(session_id = %id, "Session pairing removed");
        }
    }
}
