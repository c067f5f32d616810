//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All errors are collected,
//! not just the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::Settings;

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("voicevox.host: invalid URL '{value}': {reason}")]
    InvalidHost { value: String, reason: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must not be negative")]
    Negative { field: &'static str },

    #[error("{field}: must be a finite number of at most {max} seconds")]
    TooLarge { field: &'static str, max: f64 },
}

/// Upper bound for any cooldown, in seconds.
pub const MAX_COOLDOWN_SECS: f64 = 86_400.0;

/// Validate settings, returning every problem found.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: settings.server.bind_address.clone(),
        });
    }

    if settings.observability.metrics_enabled
        && settings
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: settings.observability.metrics_address.clone(),
        });
    }

    match Url::parse(&settings.voicevox.host) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::InvalidHost {
            value: settings.voicevox.host.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidHost {
            value: settings.voicevox.host.clone(),
            reason: e.to_string(),
        }),
    }

    let non_zero = [
        ("server.request_timeout_secs", settings.server.request_timeout_secs),
        ("voicevox.request_timeout_secs", settings.voicevox.request_timeout_secs),
        ("monitoring.frame_interval_ms", settings.monitoring.frame_interval_ms),
        ("monitoring.detector_timeout_ms", settings.monitoring.detector_timeout_ms),
        ("monitoring.readiness.max_wait_ms", settings.monitoring.readiness.max_wait_ms),
        (
            "monitoring.readiness.initial_interval_ms",
            settings.monitoring.readiness.initial_interval_ms,
        ),
        (
            "monitoring.readiness.slow_interval_ms",
            settings.monitoring.readiness.slow_interval_ms,
        ),
        (
            "monitoring.readiness.progress_every_ms",
            settings.monitoring.readiness.progress_every_ms,
        ),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let cooldowns = [
        ("voice.cooldown_secs", settings.voice.cooldown_secs),
        ("monitoring.cooldowns.horde_secs", settings.monitoring.cooldowns.horde_secs),
        ("monitoring.cooldowns.few_secs", settings.monitoring.cooldowns.few_secs),
        ("monitoring.cooldowns.warning_secs", settings.monitoring.cooldowns.warning_secs),
    ];
    for (field, value) in cooldowns {
        if value.is_nan() || value < 0.0 {
            errors.push(ValidationError::Negative { field });
        } else if !value.is_finite() || value > MAX_COOLDOWN_SECS {
            errors.push(ValidationError::TooLarge {
                field,
                max: MAX_COOLDOWN_SECS,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut settings = Settings::default();
        settings.server.bind_address = "not-an-address".into();
        settings.voicevox.host = "ftp://127.0.0.1:50021".into();
        settings.monitoring.readiness.max_wait_ms = 0;
        settings.voice.cooldown_secs = -1.0;

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero {
            field: "monitoring.readiness.max_wait_ms"
        }));
        assert!(errors.contains(&ValidationError::Negative {
            field: "voice.cooldown_secs"
        }));
    }

    #[test]
    fn test_unbounded_cooldowns_are_rejected() {
        let mut settings = Settings::default();
        settings.voice.cooldown_secs = f64::INFINITY;
        settings.monitoring.cooldowns.warning_secs = 1e30;
        settings.monitoring.cooldowns.horde_secs = MAX_COOLDOWN_SECS;

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::TooLarge {
                    field: "voice.cooldown_secs",
                    max: MAX_COOLDOWN_SECS
                },
                ValidationError::TooLarge {
                    field: "monitoring.cooldowns.warning_secs",
                    max: MAX_COOLDOWN_SECS
                },
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut settings = Settings::default();
        settings.observability.metrics_address = "nope".into();
        assert!(validate_settings(&settings).is_ok());

        settings.observability.metrics_enabled = true;
        assert!(validate_settings(&settings).is_err());
    }
}
