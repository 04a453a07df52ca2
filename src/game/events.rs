//! Random global events and the per-session timer that fires them

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::session::{GameSession, PlayerSlot, MAX_MANA};

/// HP added to every tower by a heal event
pub const HEAL_AMOUNT: i32 = 10;
/// Mana added to every player by a mana boost, before the cap
pub const MANA_BOOST: i32 = 10;
/// HP removed from every tower by a damage event
pub const DAMAGE_AMOUNT: i32 = 2;

/// Effect applied to the whole board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomEvent {
    /// Every tower gains HP, uncapped
    Heal,
    /// Every player gains mana, capped
    ManaBoost,
    /// Every tower loses HP, unclamped
    Damage,
}

impl RandomEvent {
    /// Pick one event uniformly
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => Self::Heal,
            1 => Self::ManaBoost,
            _ => Self::Damage,
        }
    }

    /// Apply to both players and return the battle log line announcing it
    pub(super) fn apply(self, players: &mut [PlayerSlot; 2]) -> String {
        match self {
            Self::Heal => {
                for tower in players.iter_mut().flat_map(|p| p.towers.iter_mut()) {
                    tower.hp += HEAL_AMOUNT;
                }
                format!("Random event: all towers healed by {} HP", HEAL_AMOUNT)
            }
            Self::ManaBoost => {
                for player in players.iter_mut() {
                    player.mana = (player.mana + MANA_BOOST).min(MAX_MANA);
                }
                format!("Random event: all players gain {} mana", MANA_BOOST)
            }
            Self::Damage => {
                for tower in players.iter_mut().flat_map(|p| p.towers.iter_mut()) {
                    tower.hp -= DAMAGE_AMOUNT;
                }
                format!("Random event: all towers take {} damage", DAMAGE_AMOUNT)
            }
        }
    }
}

/// Spawn the recurring event timer for a session.
///
/// The task only holds a weak reference, so it also ends once the session
/// is dropped from the registry. The first event fires one period in.
pub fn spawn_event_timer(session: &Arc<GameSession>, period: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(session);
    let session_id = session.id();

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(session) = weak.upgrade() else {
                break;
            };
            if session.fire_random_event().is_none() {
                break;
            }
        }

        debug!(session_id = %session_id, "Random event timer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameSettings;
    use crate::testing::{alice_vs_bob, MemoryPlayerStore};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn session() -> Arc<GameSession> {
        let store = Arc::new(MemoryPlayerStore::with_players(&["alice", "bob"]));
        alice_vs_bob(store, GameSettings::default())
    }

    #[test]
    fn pick_covers_every_event() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let picked: Vec<RandomEvent> = (0..200).map(|_| RandomEvent::pick(&mut rng)).collect();
        for event in [RandomEvent::Heal, RandomEvent::ManaBoost, RandomEvent::Damage] {
            assert!(picked.contains(&event));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_per_period() {
        let session = session();
        let handle = spawn_event_timer(&session, Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(session.poll("alice").unwrap().battle_log.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let log = session.poll("alice").unwrap().battle_log;
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("Random event: "));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(session.poll("alice").unwrap().battle_log.len(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn timer_stops_after_finish() {
        let session = session();
        let handle = spawn_event_timer(&session, Duration::from_secs(30));

        session.finish();
        let log_len = session.poll("alice").unwrap().battle_log.len();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(handle.is_finished());
        assert_eq!(session.poll("alice").unwrap().battle_log.len(), log_len);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_stops_when_session_is_dropped() {
        let session = session();
        let handle = spawn_event_timer(&session, Duration::from_secs(30));
        drop(session);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn started_timer_is_aborted_on_finish() {
        let session = session();
        session.start_events();
        session.finish();

        tokio::time::sleep(Duration::from_secs(90)).await;
        let log = session.poll("bob").unwrap().battle_log;
        assert_eq!(log, vec!["Game Over! Winner: Draw".to_string()]);
    }
}
