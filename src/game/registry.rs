//! Registry of live sessions, created lazily from matchmaking pairs

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::matchmaking::{MatchmakingService, SessionId};
use crate::store::{CatalogSource, PlayerStore};

use super::session::{GameSession, GameSettings, SessionError};

/// Registry of all live sessions
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<GameSession>>,
    lobby: Arc<MatchmakingService>,
    store: Arc<dyn PlayerStore>,
    catalog: Arc<dyn CatalogSource>,
    settings: GameSettings,
}

impl SessionRegistry {
    pub fn new(
        lobby: Arc<MatchmakingService>,
        store: Arc<dyn PlayerStore>,
        catalog: Arc<dyn CatalogSource>,
        settings: GameSettings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            lobby,
            store,
            catalog,
            settings,
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<GameSession>> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    /// Get a session, creating it if its pair has been formed.
    ///
    /// Records and catalogs are read before the map entry is locked. Only the
    /// caller that finds the entry vacant builds and stores the session, so
    /// concurrent callers for the same id all end up with the one stored session.
    pub fn get_or_create(&self, id: &SessionId) -> Result<Arc<GameSession>, SessionError> {
        if let Some(session) = self.get(id) {
            return Ok(session);
        }

        let [first, second] = self
            .lobby
            .players(id)
            .ok_or(SessionError::PairingNotReady(*id))?;

        let troops = self.catalog.load_troops()?;
        let towers = self.catalog.load_towers()?;
        let records = [self.store.load(&first)?, self.store.load(&second)?];

        match self.sessions.entry(*id) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let session = Arc::new(GameSession::new(
                    *id,
                    records,
                    troops,
                    &towers,
                    self.settings.clone(),
                    self.store.clone(),
                    self.lobby.clone(),
                ));
                session.start_events();

                entry.insert(session.clone());
                Ok(session)
            }
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Finish sessions whose time ran out, then drop those that finished
    /// more than the retention window before `now`
    pub fn reap_finished(&self, now: Instant) -> usize {
        let candidates: Vec<(SessionId, Arc<GameSession>)> = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut reaped = 0;
        for (id, session) in candidates {
            if session.finish_if_expired(now) {
                debug!(session_id = %id, "Finished session that ran out of time");
            }

            let retention = self.settings.finished_retention;
            let expired = session
                .finished_at()
                .is_some_and(|at| now.saturating_duration_since(at) >= retention);
            if expired && self.sessions.remove(&id).is_some() {
                debug!(session_id = %id, "Reaped finished session");
                reaped += 1;
            }
        }
        reaped
    }

    /// Run the reaper (periodic sweep of finished sessions)
    pub async fn run_reaper(&self) {
        let period = (self.settings.finished_retention / 2).max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;

            let reaped = self.reap_finished(Instant::now());
            if reaped > 0 {
                info!(
                    reaped,
                    active = self.active_sessions(),
                    paired = self.lobby.active_sessions(),
                    "Removed finished sessions"
                );
            }
        }
    }
}
