//! Alert classification and throttling.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::AlertCooldowns;
use crate::ws::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertLevel {
    Horde,
    Warning,
    Few,
}

impl AlertLevel {
    /// Level for a detection count, if any.
    pub fn classify(count: u32) -> Option<Self> {
        match count {
            0 => None,
            1..=4 => Some(AlertLevel::Few),
            5..=9 => Some(AlertLevel::Warning),
            _ => Some(AlertLevel::Horde),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Horde => "horde",
            AlertLevel::Warning => "warning",
            AlertLevel::Few => "few",
        }
    }

    pub fn cooldown(&self, cooldowns: &AlertCooldowns) -> Duration {
        match self {
            AlertLevel::Horde => cooldowns.horde(),
            AlertLevel::Warning => cooldowns.warning(),
            AlertLevel::Few => cooldowns.few(),
        }
    }

    pub fn notification(&self, count: u32) -> Notification {
        match self {
            AlertLevel::Horde => Notification::new(
                format!("Zombie horde detected: {count} zombies!"),
                "error",
            )
            .title("Danger")
            .importance("high"),
            AlertLevel::Warning => {
                Notification::new(format!("{count} zombies are approaching"), "warning")
                    .title("Warning")
                    .importance("high")
            }
            AlertLevel::Few => Notification::new(format!("{count} zombies nearby"), "info")
                .title("Zombie sighting"),
        }
    }

    /// Spoken line and its emotion preset.
    pub fn voice_line(&self, count: u32) -> (String, &'static str) {
        match self {
            AlertLevel::Horde => (
                format!("Danger! {count} zombies. Get out of there!"),
                "surprised",
            ),
            AlertLevel::Warning => (format!("Careful, {count} zombies are coming."), "worried"),
            AlertLevel::Few => (format!("I can see {count} zombies."), "gentle"),
        }
    }
}

/// Per-level cooldown tracking. Owned by the monitor loop.
#[derive(Debug, Default)]
pub struct AlertThrottle {
    last_fired: HashMap<AlertLevel, Instant>,
}

impl AlertThrottle {
    /// Record and allow the alert unless `level` fired within `cooldown`.
    pub fn should_fire(&mut self, level: AlertLevel, cooldown: Duration, now: Instant) -> bool {
        if let Some(last) = self.last_fired.get(&level) {
            if now.duration_since(*last) < cooldown {
                return false;
            }
        }
        self.last_fired.insert(level, now);
        true
    }
}
