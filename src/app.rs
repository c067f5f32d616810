//! Composition root.
//!
//! Wires the shared state and collaborators together. The monitoring
//! collaborator exists only when the feature is enabled.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{FileSettingsSource, SettingsHandle};
use crate::engine::{EngineLauncher, VoicevoxLauncher};
use crate::http::AppState;
use crate::lifecycle::{Shutdown, ShutdownSequencer, StartupSequencer, StartupState};
use crate::monitoring::{FeatureSettings, MonitoringControl, MonitoringService};
use crate::voice::VoiceServiceCell;
use crate::ws::ConnectionManager;

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub config_path: Option<PathBuf>,
    pub enable_monitoring: bool,
}

pub struct App {
    pub state: AppState,
    pub startup: StartupSequencer,
    pub shutdown: ShutdownSequencer,
}

impl App {
    pub fn compose(options: AppOptions) -> Self {
        let settings = SettingsHandle::default();
        let http = reqwest::Client::new();
        let connections = ConnectionManager::new();
        let features = Arc::new(FeatureSettings::new());
        let startup_state = Arc::new(StartupState::new());

        let engine: Arc<dyn EngineLauncher> =
            Arc::new(VoicevoxLauncher::new(http.clone(), settings.clone()));
        let voice = Arc::new(VoiceServiceCell::new(http, settings.clone()));
        let monitoring = options.enable_monitoring.then(|| {
            Arc::new(MonitoringService::new(
                settings.clone(),
                features.clone(),
                connections.clone(),
            )) as Arc<dyn MonitoringControl>
        });
        tracing::debug!(monitoring = monitoring.is_some(), "Composing application");

        let source = Arc::new(FileSettingsSource::new(options.config_path, settings.clone()));
        let startup = StartupSequencer::new(
            startup_state.clone(),
            source,
            engine.clone(),
            voice.clone(),
            monitoring.clone(),
        );
        let shutdown = ShutdownSequencer::new(monitoring.clone(), connections.clone(), engine);

        let state = AppState {
            settings,
            voice,
            connections,
            features,
            monitoring,
            startup: startup_state,
            shutdown: Arc::new(Shutdown::new()),
        };

        Self {
            state,
            startup,
            shutdown,
        }
    }
}
