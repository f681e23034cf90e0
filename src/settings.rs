//! Reminder-time parsing and boundary validation for settings updates.
//!
//! Validation happens here, before a patch reaches the settings store.
//! The scheduler's own fallback on malformed stored values is
//! defense-in-depth for legacy data, not the primary gate.

use crate::error::{Result, TallyError};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A wall-clock reminder time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTime {
    /// Hour of day (0-23).
    pub hour: u8,
    /// Minute of hour (0-59).
    pub minute: u8,
}

/// Hard default when even the configured default is unparseable.
pub const FALLBACK_REMINDER_TIME: ReminderTime = ReminderTime {
    hour: 20,
    minute: 0,
};

impl FromStr for ReminderTime {
    type Err = TallyError;

    /// Parse `"HH:MM"` with 0-23 / 0-59 range checks.
    fn from_str(s: &str) -> Result<Self> {
        let invalid =
            || TallyError::Settings(format!("invalid reminder time '{s}', expected HH:MM"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Validate an IANA zone name against the embedded tz database.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TallyError::Settings(format!("unknown timezone '{name}'")))
}

/// Partial update to an owner's notification settings.
///
/// Absent fields are left unchanged by
/// [`SettingsStore::update`](crate::repo::SettingsStore::update).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub reminders_enabled: Option<bool>,
    pub reminder_time: Option<String>,
    pub timezone: Option<String>,
}

impl SettingsPatch {
    /// Reject malformed times and unknown zones before they are stored.
    pub fn validate(&self) -> Result<()> {
        if let Some(time) = &self.reminder_time {
            time.parse::<ReminderTime>()?;
        }
        if let Some(zone) = &self.timezone {
            parse_timezone(zone)?;
        }
        Ok(())
    }
}
