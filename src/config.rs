//! Configuration types for the digest and reminder engine.

use crate::error::{Result, TallyError};
use crate::settings::{FALLBACK_REMINDER_TIME, ReminderTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Scheduler loop settings.
    pub scheduler: SchedulerConfig,
    /// Reminder defaults and digest thresholds.
    pub reminders: ReminderConfig,
    /// Optional app link attached to delivered reminders.
    pub app_url: Option<String>,
}

/// Reminder scheduler loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between due-checks. This is the smallest unit of
    /// delivery-time precision; values above 60 risk skipping the
    /// one-minute firing window entirely.
    pub check_interval_secs: u64,
    /// Seconds to wait after a failed bulk read before the next tick,
    /// distinct from the normal interval.
    pub repo_backoff_secs: u64,
    /// Upper bound on waiting for the loop to exit after a stop request.
    pub stop_grace_secs: u64,
    /// Delay between sends within one tick, to respect transport rate
    /// limits. Zero disables pacing.
    pub send_pacing_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            repo_backoff_secs: 60,
            stop_grace_secs: 5,
            send_pacing_ms: 100,
        }
    }
}

/// Reminder defaults applied when an owner's stored settings are absent
/// or unparseable, plus the attention threshold for digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Default reminder time, `"HH:MM"`.
    pub default_reminder_time: String,
    /// Default IANA zone name.
    pub default_timezone: String,
    /// Staleness ratio at which a project enters the attention section.
    pub stale_attention_threshold: f64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            default_reminder_time: "20:00".to_owned(),
            default_timezone: "UTC".to_owned(),
            stale_attention_threshold: 0.8,
        }
    }
}

impl ReminderConfig {
    /// Configured default reminder time, falling back to 20:00 when the
    /// configured string itself is malformed.
    pub fn default_time(&self) -> ReminderTime {
        self.default_reminder_time.parse().unwrap_or_else(|_| {
            warn!(
                "configured default reminder time '{}' is invalid, using {}",
                self.default_reminder_time, FALLBACK_REMINDER_TIME
            );
            FALLBACK_REMINDER_TIME
        })
    }

    /// Configured default zone, falling back to UTC.
    pub fn default_tz(&self) -> Tz {
        self.default_timezone.parse().unwrap_or_else(|_| {
            warn!(
                "configured default timezone '{}' is unknown, using UTC",
                self.default_timezone
            );
            Tz::UTC
        })
    }
}

impl TallyConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents)
            .map_err(|e| TallyError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Persist configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| TallyError::Config(format!("cannot serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
