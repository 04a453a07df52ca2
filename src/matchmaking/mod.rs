//! Matchmaking: FIFO queue and session pairings

pub mod queue;
pub mod service;

pub use service::{MatchmakingService, SessionId};
