//! Call-counting collaborators for lifecycle tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConfigError, Settings, SettingsHandle, SettingsSource};
use crate::engine::{EngineError, EngineLauncher};
use crate::monitoring::{MonitorStart, MonitoringControl, MonitoringError};
use crate::voice::{VoiceError, VoiceService, VoiceServiceProvider};

#[derive(Default)]
pub struct SpySettings {
    pub loads: AtomicU32,
    pub fail: AtomicBool,
}

impl SettingsSource for SpySettings {
    fn load(&self) -> Result<Arc<Settings>, ConfigError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConfigError::Env {
                var: "VOICEVOX_SPEAKER",
                value: "loud".into(),
            });
        }
        Ok(Arc::new(Settings::default()))
    }
}

/// Engine that reports ready from the `ready_on`-th check; never if `None`.
pub struct SpyEngine {
    pub starts: AtomicU32,
    pub checks: AtomicU32,
    pub stops: AtomicU32,
    ready_on: Option<u32>,
}

impl SpyEngine {
    pub fn ready_on(check: u32) -> Self {
        Self {
            starts: AtomicU32::new(0),
            checks: AtomicU32::new(0),
            stops: AtomicU32::new(0),
            ready_on: Some(check),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            ready_on: None,
            ..Self::ready_on(0)
        }
    }
}

#[async_trait]
impl EngineLauncher for SpyEngine {
    fn start_in_background(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    async fn is_ready(&self) -> bool {
        let check = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        self.ready_on.is_some_and(|n| check >= n)
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct SpyVoice {
    pub calls: AtomicU32,
    pub fail: AtomicBool,
}

impl VoiceServiceProvider for SpyVoice {
    fn voice_service(&self) -> Result<Arc<VoiceService>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::NotInitialized);
        }
        Ok(Arc::new(VoiceService::from_settings(
            reqwest::Client::new(),
            SettingsHandle::default(),
        )?))
    }
}

#[derive(Default)]
pub struct SpyMonitoring {
    pub starts: AtomicU32,
    pub stops: AtomicU32,
    pub fail: AtomicBool,
    active: AtomicBool,
}

#[async_trait]
impl MonitoringControl for SpyMonitoring {
    async fn start_monitoring(&self) -> Result<MonitorStart, MonitoringError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MonitoringError::NoDetector);
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(MonitorStart::Started)
    }

    async fn stop_monitoring(&self) -> Result<(), MonitoringError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

pub fn count(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::SeqCst)
}
