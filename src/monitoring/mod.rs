//! Zombie monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! start_monitoring (startup phase 2, WebSocket command)
//!     → service.rs spawns the monitor loop
//!     → every frame: detector.rs → count
//!     → alerts.rs classify + throttle
//!     → ws::ConnectionManager notification (+ speak line)
//!
//! features.rs toggles detection and voice lines at runtime.
//! ```
//!
//! # Design Decisions
//! - Monitoring is optional; absence is decided at composition time
//! - Detector errors never stop the loop
//! - Cooldowns are per alert level

pub mod alerts;
pub mod detector;
pub mod features;
pub mod service;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use detector::{CommandDetector, Detector};
pub use features::{FeatureSettings, SettingError, SettingValue};
pub use service::MonitoringService;

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("no detector command configured")]
    NoDetector,

    #[error("failed to run detector: {0}")]
    DetectorSpawn(#[source] io::Error),

    #[error("detector timed out after {0:?}")]
    DetectorTimeout(Duration),

    #[error("detector exited with {status}: {stderr}")]
    DetectorFailed { status: String, stderr: String },

    #[error("unrecognized detector output: {0:?}")]
    InvalidOutput(String),

    #[error("monitor task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStart {
    Started,
    AlreadyRunning,
}

/// Control surface of the monitoring feature.
#[async_trait]
pub trait MonitoringControl: Send + Sync {
    async fn start_monitoring(&self) -> Result<MonitorStart, MonitoringError>;
    async fn stop_monitoring(&self) -> Result<(), MonitoringError>;
    fn is_active(&self) -> bool;
}
