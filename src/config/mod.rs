//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, environment overrides)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → published through SettingsHandle to all subsystems
//!
//! On runtime edits (e.g. speaker change):
//!     → clone current snapshot, modify, atomic swap
//! ```
//!
//! # Design Decisions
//! - A snapshot is immutable once loaded; edits publish a new one
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use loader::{ConfigError, FileSettingsSource, SettingsSource};
pub use schema::{
    AlertCooldowns, MonitoringConfig, ReadinessConfig, Settings, VoicePreset, VoicevoxConfig,
};

/// Shared, atomically swappable settings snapshot.
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<ArcSwap<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<Settings> {
        self.inner.load_full()
    }

    /// Replace the snapshot.
    pub fn store(&self, settings: Arc<Settings>) {
        self.inner.store(settings);
    }

    /// Publish a modified copy of the current snapshot.
    pub fn update<F>(&self, f: F)
    where
        F: Fn(&mut Settings),
    {
        self.inner.rcu(|current| {
            let mut next = Settings::clone(current);
            f(&mut next);
            next
        });
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
