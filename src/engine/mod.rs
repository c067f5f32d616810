//! Voice synthesis engine (VOICEVOX) subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     launcher.rs start_in_background()
//!     → spawned task: probe /version → spawn engine process → confirm with backoff
//!
//! Readiness:
//!     launcher.rs is_ready() → probe /version (sticky once true)
//!
//! Synthesis (via voice service):
//!     client.rs audio_query → synthesis → WAV bytes
//! ```
//!
//! # Design Decisions
//! - Engine start never blocks the caller; readiness is only observed by polling
//! - The launcher owns the child process so shutdown can terminate it

pub mod client;
pub mod launcher;

use async_trait::async_trait;
use thiserror::Error;

pub use client::VoicevoxClient;
pub use launcher::VoicevoxLauncher;

/// Errors talking to or launching the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("engine returned status {status} for {endpoint}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("engine executable not found")]
    ExecutableNotFound,

    #[error("failed to spawn engine '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stop engine: {0}")]
    Stop(#[source] std::io::Error),
}

/// Starts the synthesis engine and reports its readiness.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Begin starting the engine without waiting for it.
    fn start_in_background(&self);

    /// Whether the engine currently accepts requests.
    async fn is_ready(&self) -> bool;

    /// Stop an engine process started by this launcher.
    async fn shutdown(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
