//! Runtime state for one run of the launcher

use anylauncher_catalog::{CatalogError, CatalogService, CatalogStore, GameId, GameRecord};
use anylauncher_config::{CatalogLocation, ConfigError, LauncherConfig};
use anylauncher_launcher::{LaunchOutcome, ProcessLauncher, ShutdownReport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No game is selected")]
    NothingSelected,
}

impl SessionError {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SessionError::Catalog(e) => e.hint(),
            SessionError::NothingSelected => {
                Some("Select a game first with `anylauncher select <id>`.")
            }
            SessionError::Config(_) => None,
        }
    }
}

/// Owns the configuration, the catalog and the processes started this run
pub struct Session {
    config: LauncherConfig,
    location: CatalogLocation,
    catalog: CatalogService,
    launcher: ProcessLauncher,
}

impl Session {
    /// Resolve the catalog location and set up the services
    pub fn open(config: LauncherConfig) -> Result<Self, SessionError> {
        let location = CatalogLocation::resolve(&config.catalog)?;
        tracing::info!(
            "Catalog at {} ({})",
            location.catalog_file().display(),
            location.source.describe()
        );

        let store = CatalogStore::open(&location, config.catalog.lock_timeout());
        let launcher = ProcessLauncher::with_settings(&config.launch);

        Ok(Self {
            catalog: CatalogService::new(store),
            launcher,
            location,
            config,
        })
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn location(&self) -> &CatalogLocation {
        &self.location
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn launcher_mut(&mut self) -> &mut ProcessLauncher {
        &mut self.launcher
    }

    /// Launch the selected game
    pub fn launch_selected(&mut self) -> Result<(GameRecord, LaunchOutcome), SessionError> {
        let record = self
            .catalog
            .get_selected()?
            .ok_or(SessionError::NothingSelected)?;
        let outcome = self.launcher.launch_record(&record);
        Ok((record, outcome))
    }

    /// Launch a game by id
    pub fn launch_game(&mut self, id: &GameId) -> Result<(GameRecord, LaunchOutcome), SessionError> {
        let record = self
            .catalog
            .get_game(id)?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        let outcome = self.launcher.launch_record(&record);
        Ok((record, outcome))
    }

    /// Stop every game this session started
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.launcher.shutdown()
    }
}
