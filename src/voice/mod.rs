//! Voice service subsystem.
//!
//! The voice service is created once, during startup, and shared through
//! [`VoiceServiceCell`]. Routes that need it answer 503 until then.

pub mod analyzer;
pub mod service;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::config::SettingsHandle;
use crate::engine::EngineError;

pub use analyzer::{Analysis, Prosody};
pub use service::{SynthesisRequest, VoiceService};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("text is empty")]
    EmptyText,

    #[error("voice service is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Accessor for the process-wide voice service.
pub trait VoiceServiceProvider: Send + Sync {
    fn voice_service(&self) -> Result<Arc<VoiceService>, VoiceError>;
}

/// Lazily constructed voice service.
pub struct VoiceServiceCell {
    http: reqwest::Client,
    settings: SettingsHandle,
    cell: OnceCell<Arc<VoiceService>>,
}

impl VoiceServiceCell {
    pub fn new(http: reqwest::Client, settings: SettingsHandle) -> Self {
        Self {
            http,
            settings,
            cell: OnceCell::new(),
        }
    }

    /// The service, if it has been constructed.
    pub fn get(&self) -> Option<Arc<VoiceService>> {
        self.cell.get().cloned()
    }
}

impl VoiceServiceProvider for VoiceServiceCell {
    fn voice_service(&self) -> Result<Arc<VoiceService>, VoiceError> {
        self.cell
            .get_or_try_init(|| {
                VoiceService::from_settings(self.http.clone(), self.settings.clone()).map(Arc::new)
            })
            .cloned()
    }
}
