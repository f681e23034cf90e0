//! Per-owner due matching: converts the tick instant into each owner's
//! local civil time and fires on an exact (hour, minute) match.
//!
//! Malformed stored settings degrade instead of dropping the owner:
//! an unparseable time falls back to the configured default, an unknown
//! zone falls back to UTC.

use crate::config::ReminderConfig;
use crate::model::{NotificationSettings, Owner};
use crate::settings::ReminderTime;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// True when the owner's reminder should fire at `now`.
///
/// This is a point-in-time equality check on the owner's local
/// (hour, minute), not a "time has passed" check, so it matches on
/// exactly one tick per day when the tick interval is ≤ 60 seconds.
pub fn is_due(
    owner: &Owner,
    settings: &NotificationSettings,
    reminders: &ReminderConfig,
    now: DateTime<Utc>,
) -> bool {
    if !settings.reminders_enabled {
        return false;
    }

    let target: ReminderTime = settings.reminder_time.parse().unwrap_or_else(|_| {
        warn!(
            "owner {} has malformed reminder time '{}', using default",
            owner.id, settings.reminder_time
        );
        reminders.default_time()
    });

    let tz: Tz = settings.timezone.parse().unwrap_or_else(|_| {
        warn!(
            "owner {} has unknown timezone '{}', using UTC",
            owner.id, settings.timezone
        );
        Tz::UTC
    });

    let local = now.with_timezone(&tz);
    local.hour() == u32::from(target.hour) && local.minute() == u32::from(target.minute)
}

/// Filter the owner roster down to those due at `now`.
///
/// Order is stable (input order); no cross-owner ordering is guaranteed
/// beyond that.
pub fn owners_due_at(
    rows: &[(Owner, NotificationSettings)],
    reminders: &ReminderConfig,
    now: DateTime<Utc>,
) -> Vec<(Owner, NotificationSettings)> {
    rows.iter()
        .filter(|(owner, settings)| is_due(owner, settings, reminders, now))
        .cloned()
        .collect()
}
