//! Engine process launcher.
//!
//! # Responsibilities
//! - Start the engine in a background task (fire-and-forget)
//! - Report readiness via the engine's /version endpoint
//! - Terminate the engine process on shutdown

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::SettingsHandle;
use crate::engine::{EngineError, EngineLauncher, VoicevoxClient};
use crate::resilience::backoff::backoff_delay;

/// Install locations tried when no engine path is configured.
const DEFAULT_ENGINE_PATHS: &[&str] = &[
    r"C:\Program Files\VOICEVOX\vv-engine\run.exe",
    r"C:\Program Files\VOICEVOX Engine\run.exe",
    r"C:\VOICEVOX Engine\run.exe",
    "/opt/voicevox_engine/run",
    "/usr/local/share/voicevox_engine/run",
];

const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const RUNNING_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const CONFIRM_ATTEMPTS: u32 = 10;
const CONFIRM_BASE_DELAY: Duration = Duration::from_millis(500);
const CONFIRM_MAX_DELAY: Duration = Duration::from_secs(2);

/// Launcher for a local VOICEVOX engine.
#[derive(Clone)]
pub struct VoicevoxLauncher {
    inner: Arc<LauncherInner>,
}

struct LauncherInner {
    http: reqwest::Client,
    settings: SettingsHandle,
    ready: AtomicBool,
    child: Mutex<Option<Child>>,
}

impl VoicevoxLauncher {
    /// Create a launcher. Engine host and path are read from the settings
    /// snapshot current at start time.
    pub fn new(http: reqwest::Client, settings: SettingsHandle) -> Self {
        Self {
            inner: Arc::new(LauncherInner {
                http,
                settings,
                ready: AtomicBool::new(false),
                child: Mutex::new(None),
            }),
        }
    }

    /// Whether the engine answers right now, regardless of who started it.
    pub async fn is_running(&self) -> bool {
        self.inner.probe(RUNNING_PROBE_TIMEOUT).await
    }
}

impl LauncherInner {
    fn client(&self) -> Result<VoicevoxClient, EngineError> {
        VoicevoxClient::from_config(self.http.clone(), &self.settings.load().voicevox)
    }

    async fn probe(&self, timeout: Duration) -> bool {
        match self.client() {
            Ok(client) => client.version(timeout).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn start_engine(&self) -> Result<bool, EngineError> {
        if self.probe(RUNNING_PROBE_TIMEOUT).await {
            tracing::info!("Voice engine already running");
            return Ok(true);
        }

        let configured = self.settings.load().voicevox.engine_path.clone();
        let path = resolve_engine_path(configured.as_deref()).ok_or(EngineError::ExecutableNotFound)?;

        let mut command = Command::new(&path);
        command
            .arg("--no_gui")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| EngineError::Spawn {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), pid = ?child.id(), "Voice engine process spawned");
        *self.child.lock().await = Some(child);

        for attempt in 1..=CONFIRM_ATTEMPTS {
            tracing::debug!(attempt, max_attempts = CONFIRM_ATTEMPTS, "Confirming voice engine startup");
            if self.probe(RUNNING_PROBE_TIMEOUT).await {
                return Ok(true);
            }
            sleep(backoff_delay(attempt, CONFIRM_BASE_DELAY, CONFIRM_MAX_DELAY)).await;
        }

        Ok(false)
    }
}

/// Pick the engine executable: the configured path if any, otherwise the
/// first default location that exists.
pub fn resolve_engine_path(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    DEFAULT_ENGINE_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

#[async_trait]
impl EngineLauncher for VoicevoxLauncher {
    fn start_in_background(&self) {
        self.inner.ready.store(false, Ordering::SeqCst);

        let inner = self.inner.clone();
        tokio::spawn(async move {
            match inner.start_engine().await {
                Ok(true) => tracing::info!("Voice engine start task finished: engine running"),
                Ok(false) => tracing::warn!("Voice engine is not responding; it may have failed to start"),
                Err(e) => tracing::error!(error = %e, "Voice engine start task failed"),
            }
        });

        tracing::debug!("Voice engine start task spawned");
    }

    async fn is_ready(&self) -> bool {
        if self.inner.ready.load(Ordering::SeqCst) {
            return true;
        }

        let ready = self.inner.probe(READY_PROBE_TIMEOUT).await;
        if ready {
            self.inner.ready.store(true, Ordering::SeqCst);
        }
        ready
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        self.inner.ready.store(false, Ordering::SeqCst);

        let Some(mut child) = self.inner.child.lock().await.take() else {
            tracing::debug!("No voice engine process to stop");
            return Ok(());
        };

        tracing::info!(pid = ?child.id(), "Stopping voice engine process");
        child.kill().await.map_err(EngineError::Stop)?;
        tracing::info!("Voice engine process stopped");
        Ok(())
    }
}
