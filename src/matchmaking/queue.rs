//! Matchmaking queue implementation

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Player waiting in the matchmaking queue
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub username: String,
    pub queued_at: Instant,
}

impl QueuedPlayer {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            queued_at: Instant::now(),
        }
    }

    /// How long this player has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// FIFO of waiting players; insertion order is priority
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    queue: VecDeque<QueuedPlayer>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player to the tail. Returns false if already queued.
    pub fn enqueue(&mut self, player: QueuedPlayer) -> bool {
        if self.contains(&player.username) {
            return false;
        }
        self.queue.push_back(player);
        true
    }

    /// Remove a player from the queue
    pub fn dequeue(&mut self, username: &str) -> Option<QueuedPlayer> {
        let pos = self.queue.iter().position(|p| p.username == username)?;
        self.queue.remove(pos)
    }

    /// Check if a player is in the queue
    pub fn contains(&self, username: &str) -> bool {
        self.queue.iter().any(|p| p.username == username)
    }

    /// Get queue length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop the two longest-waiting players, if there are two
    pub fn try_pair(&mut self) -> Option<(QueuedPlayer, QueuedPlayer)> {
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;
        Some((first, second))
    }
}
