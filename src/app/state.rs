//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::matchmaking::MatchmakingService;
use crate::progression::ProgressionService;
use crate::store::{CatalogSource, JsonCatalog, JsonPlayerStore, PlayerStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lobby: Arc<MatchmakingService>,
    pub sessions: Arc<SessionRegistry>,
    pub progression: ProgressionService,
}

impl AppState {
    /// Build state over the JSON player store and catalog named in `config`
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(JsonPlayerStore::open(&config.data_dir)?);
        let catalog = Arc::new(JsonCatalog::new(&config.catalog_dir));

        // Fail at startup rather than on the first session
        let troops = catalog.load_troops()?;
        let towers = catalog.load_towers()?;
        info!(
            troops = troops.len(),
            towers = towers.len(),
            catalog_dir = %config.catalog_dir.display(),
            "Catalog loaded"
        );

        Ok(Self::with_parts(config, store, catalog))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn PlayerStore>,
        catalog: Arc<dyn CatalogSource>,
    ) -> Self {
        let settings = config.game_settings();

        // Initialize lobby (Arc for sharing across cloned AppState and sessions)
        let lobby = Arc::new(MatchmakingService::new());

        let sessions = Arc::new(SessionRegistry::new(
            lobby.clone(),
            store.clone(),
            catalog.clone(),
            settings,
        ));

        let progression = ProgressionService::new(store, catalog);

        Self {
            config: Arc::new(config),
            lobby,
            sessions,
            progression,
        }
    }
}
