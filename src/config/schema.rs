//! Configuration schema definitions.
//!
//! This module defines the complete settings structure for the backend.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings for the backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Enables debug logging and verbose diagnostics.
    pub debug: bool,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// VOICEVOX engine connection and launch settings.
    pub voicevox: VoicevoxConfig,

    /// Voice playback settings and emotion presets.
    pub voice: VoiceConfig,

    /// Monitoring feature settings.
    pub monitoring: MonitoringConfig,

    /// Directories served or written by the backend.
    pub paths: PathsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// VOICEVOX engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VoicevoxConfig {
    /// Base URL of the engine HTTP API.
    pub host: String,

    /// Default speaker ID.
    pub speaker: u32,

    /// Path to the engine executable. Default install locations are tried when unset.
    pub engine_path: Option<String>,

    /// Timeout for synthesis calls in seconds.
    pub request_timeout_secs: u64,
}

impl Default for VoicevoxConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:50021".to_string(),
            speaker: 0,
            engine_path: None,
            request_timeout_secs: 30,
        }
    }
}

/// Prosody adjustments applied for an emotion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct VoicePreset {
    pub pitch: f64,
    pub intonation: f64,
    pub speed: f64,
}

impl VoicePreset {
    pub const NEUTRAL: VoicePreset = VoicePreset {
        pitch: 0.0,
        intonation: 1.0,
        speed: 1.0,
    };
}

/// Voice configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Window in seconds during which a repeated line is suppressed.
    pub cooldown_secs: f64,

    /// Emotion name to preset.
    pub presets: BTreeMap<String, VoicePreset>,
}

impl VoiceConfig {
    /// Preset for an emotion, neutral when unknown.
    pub fn preset(&self, emotion: &str) -> VoicePreset {
        self.presets
            .get(emotion)
            .copied()
            .unwrap_or(VoicePreset::NEUTRAL)
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        let presets = [
            ("happy", 0.06, 1.3, 1.05),
            ("worried", -0.03, 0.9, 0.95),
            ("surprised", 0.12, 1.5, 1.2),
            ("gentle", -0.06, 1.1, 0.9),
            ("sleepy", -0.09, 0.8, 0.8),
        ]
        .into_iter()
        .map(|(name, pitch, intonation, speed)| {
            (
                name.to_string(),
                VoicePreset {
                    pitch,
                    intonation,
                    speed,
                },
            )
        })
        .collect();

        Self {
            cooldown_secs: 1.5,
            presets,
        }
    }
}

/// Monitoring feature configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Detector command and arguments. Prints a zombie count per invocation.
    pub detector_command: Vec<String>,

    /// Timeout for a single detector invocation in milliseconds.
    pub detector_timeout_ms: u64,

    /// Interval between detection ticks in milliseconds.
    pub frame_interval_ms: u64,

    /// Per-alert cooldowns.
    pub cooldowns: AlertCooldowns,

    /// Engine readiness wait before monitoring starts.
    pub readiness: ReadinessConfig,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            detector_command: Vec::new(),
            detector_timeout_ms: 5_000,
            frame_interval_ms: 500,
            cooldowns: AlertCooldowns::default(),
            readiness: ReadinessConfig::default(),
        }
    }
}

/// Cooldowns in seconds between two alerts of the same level.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertCooldowns {
    pub horde_secs: f64,
    pub few_secs: f64,
    pub warning_secs: f64,
}

impl Default for AlertCooldowns {
    fn default() -> Self {
        Self {
            horde_secs: 8.0,
            few_secs: 5.0,
            warning_secs: 6.0,
        }
    }
}

/// Readiness wait configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Total wait budget in milliseconds.
    pub max_wait_ms: u64,

    /// Interval used until `slow_after_ms` has elapsed.
    pub initial_interval_ms: u64,

    /// Interval used once `slow_after_ms` has elapsed.
    pub slow_interval_ms: u64,

    /// Elapsed time after which polling slows down.
    pub slow_after_ms: u64,

    /// Elapsed time between two progress log lines.
    pub progress_every_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: 15_000,
            initial_interval_ms: 300,
            slow_interval_ms: 1_000,
            slow_after_ms: 5_000,
            progress_every_ms: 5_000,
        }
    }
}

/// Directories used by the backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub static_dir: String,
    pub logs_dir: String,
    pub temp_dir: String,
    pub shared_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            static_dir: "data/static".to_string(),
            logs_dir: "data/logs".to_string(),
            temp_dir: "data/temp".to_string(),
            shared_dir: "data/shared".to_string(),
        }
    }
}

impl PathsConfig {
    /// All configured directories.
    pub fn all(&self) -> [&str; 4] {
        [
            &self.static_dir,
            &self.logs_dir,
            &self.temp_dir,
            &self.shared_dir,
        ]
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Saturating conversion; out-of-range values never panic.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl AlertCooldowns {
    pub fn horde(&self) -> Duration {
        secs(self.horde_secs)
    }

    pub fn few(&self) -> Duration {
        secs(self.few_secs)
    }

    pub fn warning(&self) -> Duration {
        secs(self.warning_secs)
    }
}

impl VoiceConfig {
    pub fn cooldown(&self) -> Duration {
        secs(self.cooldown_secs)
    }
}
