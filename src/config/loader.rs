//! Settings loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::Settings;
use crate::config::validation::{validate_settings, ValidationError};
use crate::config::SettingsHandle;

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse settings from TOML text. Missing fields take their defaults.
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load settings from an optional TOML file, apply environment overrides
/// and validate the result.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_settings(&content)?
        }
        None => Settings::default(),
    };

    apply_env_overrides(&mut settings, |var| std::env::var(var).ok())?;
    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

/// Apply environment overrides on top of file settings.
///
/// `lookup` resolves a variable name to its value.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("VOICEVOX_HOST") {
        settings.voicevox.host = host;
    }
    if let Some(path) = lookup("VOICEVOX_ENGINE_PATH") {
        settings.voicevox.engine_path = Some(path).filter(|p| !p.is_empty());
    }
    if let Some(value) = lookup("VOICEVOX_SPEAKER") {
        settings.voicevox.speaker = parse_var("VOICEVOX_SPEAKER", value)?;
    }
    if let Some(value) = lookup("VOICE_COOLDOWN") {
        settings.voice.cooldown_secs = parse_var("VOICE_COOLDOWN", value)?;
    }
    if let Some(value) = lookup("ZOMBIE_ALERT_COOLDOWN") {
        settings.monitoring.cooldowns.horde_secs = parse_var("ZOMBIE_ALERT_COOLDOWN", value)?;
    }
    if let Some(value) = lookup("ZOMBIE_FEW_ALERT_COOLDOWN") {
        settings.monitoring.cooldowns.few_secs = parse_var("ZOMBIE_FEW_ALERT_COOLDOWN", value)?;
    }
    if let Some(value) = lookup("ZOMBIE_WARNING_COOLDOWN") {
        settings.monitoring.cooldowns.warning_secs =
            parse_var("ZOMBIE_WARNING_COOLDOWN", value)?;
    }
    if let Some(value) = lookup("DEBUG_MODE") {
        settings.debug = value.eq_ignore_ascii_case("true");
    }

    let dirs = [
        ("STATIC_DIR", &mut settings.paths.static_dir),
        ("LOGS_DIR", &mut settings.paths.logs_dir),
        ("TEMP_DIR", &mut settings.paths.temp_dir),
        ("SHARED_DIR", &mut settings.paths.shared_dir),
    ];
    for (var, dir) in dirs {
        if let Some(value) = lookup(var) {
            *dir = value;
        }
    }

    Ok(())
}

fn parse_var<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

/// Create the configured directories. Failures are logged, not fatal.
pub fn ensure_directories(settings: &Settings) {
    for dir in settings.paths.all() {
        let path = Path::new(dir);
        if path.exists() {
            continue;
        }
        match fs::create_dir_all(path) {
            Ok(()) => tracing::info!(path = %dir, "Created directory"),
            Err(e) => tracing::error!(path = %dir, error = %e, "Failed to create directory"),
        }
    }
}

/// Provides validated settings to the startup sequence.
pub trait SettingsSource: Send + Sync {
    fn load(&self) -> Result<Arc<Settings>, ConfigError>;
}

/// Settings source backed by an optional TOML file.
///
/// Every successful load is published into the shared handle.
pub struct FileSettingsSource {
    path: Option<PathBuf>,
    handle: SettingsHandle,
}

impl FileSettingsSource {
    pub fn new(path: Option<PathBuf>, handle: SettingsHandle) -> Self {
        Self { path, handle }
    }
}

impl SettingsSource for FileSettingsSource {
    fn load(&self) -> Result<Arc<Settings>, ConfigError> {
        let settings = load_settings(self.path.as_deref())?;
        ensure_directories(&settings);
        let settings = Arc::new(settings);
        self.handle.store(settings.clone());
        Ok(settings)
    }
}
