//! Startup orchestration.
//!
//! # Phases
//! ```text
//! NotStarted → InitializingServices → StartingMonitoring → Complete
//!                     │
//!                     └─ failure → NotStarted (a later run retries)
//! ```
//!
//! Phase 1 (settings, engine start, voice service) is fatal on error.
//! Phase 2 (readiness wait, monitoring start) is best-effort: its errors are
//! logged and never reach the caller.
//!
//! # Design Decisions
//! - Entry is guarded by a compare-and-set, so concurrent runs cannot both
//!   perform phase 1
//! - Engine start is fire-and-forget; readiness is only observed by polling
//! - Monitoring starts even when the engine never became ready

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::{ConfigError, Settings, SettingsSource};
use crate::engine::EngineLauncher;
use crate::lifecycle::readiness::{wait_until_ready, ReadinessPolicy};
use crate::monitoring::{MonitorStart, MonitoringControl};
use crate::observability::metrics;
use crate::voice::{VoiceError, VoiceServiceProvider};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    NotStarted = 0,
    InitializingServices = 1,
    StartingMonitoring = 2,
    Complete = 3,
}

impl StartupPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StartupPhase::InitializingServices,
            2 => StartupPhase::StartingMonitoring,
            3 => StartupPhase::Complete,
            _ => StartupPhase::NotStarted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StartupPhase::NotStarted => "not_started",
            StartupPhase::InitializingServices => "initializing_services",
            StartupPhase::StartingMonitoring => "starting_monitoring",
            StartupPhase::Complete => "complete",
        }
    }
}

/// Process-wide startup progress, shared with the HTTP layer.
#[derive(Debug, Default)]
pub struct StartupState {
    phase: AtomicU8,
}

impl StartupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> StartupPhase {
        StartupPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == StartupPhase::Complete
    }

    /// Claim the run. On failure returns the phase that blocked it.
    fn try_begin(&self) -> Result<(), StartupPhase> {
        self.phase
            .compare_exchange(
                StartupPhase::NotStarted as u8,
                StartupPhase::InitializingServices as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(StartupPhase::from_u8)
    }

    fn set(&self, phase: StartupPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

/// Marks startup complete when dropped. Phase 2 runs under this guard so a
/// run abandoned during the readiness wait cannot leave the phase stuck.
struct CompleteOnDrop<'a>(&'a StartupState);

impl Drop for CompleteOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(StartupPhase::Complete);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// This call ran the sequence.
    Completed,
    /// An earlier call already finished it.
    AlreadyComplete,
    /// Another call is running it right now.
    InProgress,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("failed to initialize voice service: {0}")]
    Voice(#[from] VoiceError),
}

/// Brings the backend's services up in order.
pub struct StartupSequencer {
    state: Arc<StartupState>,
    settings: Arc<dyn SettingsSource>,
    engine: Arc<dyn EngineLauncher>,
    voice: Arc<dyn VoiceServiceProvider>,
    monitoring: Option<Arc<dyn MonitoringControl>>,
}

impl StartupSequencer {
    pub fn new(
        state: Arc<StartupState>,
        settings: Arc<dyn SettingsSource>,
        engine: Arc<dyn EngineLauncher>,
        voice: Arc<dyn VoiceServiceProvider>,
        monitoring: Option<Arc<dyn MonitoringControl>>,
    ) -> Self {
        Self {
            state,
            settings,
            engine,
            voice,
            monitoring,
        }
    }

    pub fn state(&self) -> &Arc<StartupState> {
        &self.state
    }

    /// Run the startup sequence once.
    ///
    /// Repeated or concurrent calls return without side effects. A phase-1
    /// error is returned and leaves the state `NotStarted`.
    pub async fn run(&self) -> Result<StartupOutcome, StartupError> {
        if let Err(phase) = self.state.try_begin() {
            return Ok(if phase == StartupPhase::Complete {
                tracing::info!("Startup already complete; skipping");
                metrics::record_startup("already_complete");
                StartupOutcome::AlreadyComplete
            } else {
                tracing::info!(phase = phase.as_str(), "Startup already in progress; skipping");
                metrics::record_startup("in_progress");
                StartupOutcome::InProgress
            });
        }

        let started = Instant::now();
        tracing::info!("Starting application initialization");

        let settings = match self.initialize_services() {
            Ok(settings) => settings,
            Err(e) => {
                self.state.set(StartupPhase::NotStarted);
                metrics::record_startup("failed");
                tracing::error!(error = %e, "Application initialization failed");
                return Err(e);
            }
        };

        self.state.set(StartupPhase::StartingMonitoring);
        {
            let _complete = CompleteOnDrop(&self.state);
            self.start_monitoring(&settings).await;
        }

        metrics::record_startup("completed");
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Application initialization complete"
        );
        Ok(StartupOutcome::Completed)
    }

    fn initialize_services(&self) -> Result<Arc<Settings>, StartupError> {
        let settings = self.settings.load()?;
        tracing::info!(
            voicevox_host = %settings.voicevox.host,
            debug = settings.debug,
            "Settings loaded"
        );

        self.engine.start_in_background();
        tracing::info!("Voice engine start requested");

        self.voice.voice_service()?;
        tracing::info!("Voice service initialized");

        Ok(settings)
    }

    async fn start_monitoring(&self, settings: &Settings) {
        let Some(monitoring) = &self.monitoring else {
            tracing::warn!("Monitoring is not enabled; skipping");
            return;
        };

        let policy = ReadinessPolicy::from(&settings.monitoring.readiness);
        tracing::info!(
            max_wait_ms = policy.max_wait.as_millis() as u64,
            "Waiting for voice engine before starting monitoring"
        );

        let engine = self.engine.as_ref();
        let outcome = wait_until_ready(&policy, move || engine.is_ready()).await;
        metrics::record_readiness_poll(outcome.ready, outcome.attempts, outcome.elapsed);

        if outcome.ready {
            tracing::info!(
                elapsed_secs = outcome.elapsed.as_secs_f64(),
                attempts = outcome.attempts,
                "Voice engine ready"
            );
        } else {
            tracing::warn!(
                elapsed_secs = outcome.elapsed.as_secs_f64(),
                attempts = outcome.attempts,
                "Voice engine not ready in time; starting monitoring anyway"
            );
        }

        match monitoring.start_monitoring().await {
            Ok(MonitorStart::Started) => tracing::info!("Monitoring started"),
            Ok(MonitorStart::AlreadyRunning) => tracing::info!("Monitoring was already running"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start monitoring; continuing without it")
            }
        }
    }
}
