//! Domain types read by the digest engine.
//!
//! Projects, tasks, and owners are read-only to this crate; they are
//! loaded through the [`Repository`](crate::repo::Repository) contract
//! and never mutated here. Notification settings are the one mutable
//! record, and only through [`SettingsStore`](crate::repo::SettingsStore).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner identifier.
pub type OwnerId = i64;
/// Project identifier.
pub type ProjectId = i64;
/// Task identifier.
pub type TaskId = i64;

/// The identity that owns tracked projects and one settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    /// Opaque transport identity reminders are addressed to
    /// (chat id, device token, email — the notifier decides).
    pub recipient: String,
}

/// A tracked work-item collection with an expected activity cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub owner_id: OwnerId,
    /// Expected cadence of activity in days (e.g. 7 for weekly).
    ///
    /// Zero is tolerated by the staleness math (treated as infinitely
    /// stale) but should be rejected at the write boundary.
    pub period_days: u32,
    /// Last explicit edit, UTC.
    pub updated_at: DateTime<Utc>,
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

/// A work item belonging to one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub status: TaskStatus,
    /// Set when status transitions to [`TaskStatus::Done`], cleared on revert.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A project bundled with its tasks, as returned by the bulk read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectWithTasks {
    pub project: Project,
    pub tasks: Vec<Task>,
}

/// Per-owner notification preferences.
///
/// Created lazily on first access via
/// [`SettingsStore::get_or_create`](crate::repo::SettingsStore::get_or_create);
/// never absent after first touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub reminders_enabled: bool,
    /// Wall-clock reminder time, `"HH:MM"`.
    pub reminder_time: String,
    /// IANA zone name.
    pub timezone: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            reminders_enabled: true,
            reminder_time: "20:00".to_owned(),
            timezone: "UTC".to_owned(),
        }
    }
}

/// Interpret a zone-naive storage timestamp as UTC.
///
/// Storage backends that persist naive timestamps must normalize through
/// this at the repository boundary; naive values are assumed UTC, never
/// rejected.
pub fn assume_utc(ts: NaiveDateTime) -> DateTime<Utc> {
    ts.and_utc()
}
