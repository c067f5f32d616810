//! Runtime-editable monitoring toggles.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const ZOMBIE_DETECTION: &str = "zombieDetection";
pub const VOICE_NOTIFICATION: &str = "voiceNotification";

const DEFAULTS: [(&str, SettingValue); 7] = [
    (ZOMBIE_DETECTION, SettingValue::Bool(true)),
    (VOICE_NOTIFICATION, SettingValue::Bool(true)),
    ("multipleDetection", SettingValue::Bool(true)),
    ("screenCapture", SettingValue::Bool(true)),
    ("performanceMonitoring", SettingValue::Bool(true)),
    ("detectionSensitivity", SettingValue::Float(0.5)),
    ("cooldownPeriod", SettingValue::Float(5.0)),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Float(f64),
}

#[derive(Debug, Error)]
pub enum SettingError {
    #[error("unknown setting: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}: expected {expected}, got {value}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        value: Value,
    },
}

/// Feature flags and tunables shared by routes and the monitor loop.
pub struct FeatureSettings {
    values: DashMap<&'static str, SettingValue>,
}

impl FeatureSettings {
    pub fn new() -> Self {
        Self {
            values: DEFAULTS.into_iter().collect(),
        }
    }

    /// Set `key` to `value`, coerced to the type of the current value.
    pub fn update(&self, key: &str, value: &Value) -> Result<SettingValue, SettingError> {
        let mut entry = self
            .values
            .get_mut(key)
            .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;

        let coerced = coerce(key, *entry.value(), value)?;
        *entry.value_mut() = coerced;
        tracing::info!(key, value = ?coerced, "Feature setting updated");
        Ok(coerced)
    }

    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).map(|entry| *entry.value())
    }

    /// True only for boolean settings that are switched on.
    pub fn is_enabled(&self, key: &str) -> bool {
        matches!(self.get(key), Some(SettingValue::Bool(true)))
    }

    pub fn get_all(&self) -> BTreeMap<String, SettingValue> {
        self.values
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect()
    }
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self::new()
    }
}

fn coerce(key: &str, current: SettingValue, value: &Value) -> Result<SettingValue, SettingError> {
    let coerced = match current {
        SettingValue::Bool(_) => match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(matches!(
                s.to_lowercase().as_str(),
                "true" | "yes" | "1" | "on"
            )),
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            _ => None,
        }
        .map(SettingValue::Bool),
        SettingValue::Float(_) => match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
        .map(SettingValue::Float),
    };

    coerced.ok_or_else(|| SettingError::InvalidValue {
        key: key.to_string(),
        expected: match current {
            SettingValue::Bool(_) => "boolean",
            SettingValue::Float(_) => "number",
        },
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let features = FeatureSettings::new();
        let all = features.get_all();

        assert_eq!(all.len(), 7);
        assert!(features.is_enabled(ZOMBIE_DETECTION));
        assert_eq!(all["detectionSensitivity"], SettingValue::Float(0.5));
        assert_eq!(all["cooldownPeriod"], SettingValue::Float(5.0));
    }

    #[test]
    fn test_bool_coercion() {
        let features = FeatureSettings::new();

        assert_eq!(
            features.update(VOICE_NOTIFICATION, &json!("off")).unwrap(),
            SettingValue::Bool(false)
        );
        assert_eq!(
            features.update(VOICE_NOTIFICATION, &json!("YES")).unwrap(),
            SettingValue::Bool(true)
        );
        assert_eq!(
            features.update(VOICE_NOTIFICATION, &json!(0)).unwrap(),
            SettingValue::Bool(false)
        );
        assert!(!features.is_enabled(VOICE_NOTIFICATION));
        assert!(features.update(VOICE_NOTIFICATION, &json!([true])).is_err());
    }

    #[test]
    fn test_float_coercion() {
        let features = FeatureSettings::new();

        assert_eq!(
            features.update("detectionSensitivity", &json!("0.8")).unwrap(),
            SettingValue::Float(0.8)
        );
        assert_eq!(
            features.update("cooldownPeriod", &json!(true)).unwrap(),
            SettingValue::Float(1.0)
        );
        assert!(matches!(
            features.update("cooldownPeriod", &json!("soon")),
            Err(SettingError::InvalidValue { expected: "number", .. })
        ));
        assert_eq!(features.get("cooldownPeriod"), Some(SettingValue::Float(1.0)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let features = FeatureSettings::new();
        assert!(matches!(
            features.update("laserEyes", &json!(true)),
            Err(SettingError::UnknownKey(key)) if key == "laserEyes"
        ));
    }

    #[test]
    fn test_values_serialize_untagged() {
        let features = FeatureSettings::new();
        let value = serde_json::to_value(features.get_all()).unwrap();
        assert_eq!(value["screenCapture"], json!(true));
        assert_eq!(value["detectionSensitivity"], json!(0.5));
    }
}
