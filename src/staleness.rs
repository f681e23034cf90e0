//! Staleness math: last-activity resolution and the staleness ratio.
//!
//! The ratio is a single comparable scalar across projects with
//! heterogeneous cadences: 0 = fresh, 1.0 = exactly due, >1 = overdue.
//! Pure functions, no I/O.

use crate::model::{Project, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest activity timestamp for a project: the later of the project's
/// `updated_at` and the maximum `completed_at` among its tasks.
///
/// Always ≥ `project.updated_at`. Tasks without a completion time are
/// ignored.
pub fn last_activity(project: &Project, tasks: &[Task]) -> DateTime<Utc> {
    tasks
        .iter()
        .filter_map(|task| task.completed_at)
        .fold(project.updated_at, DateTime::max)
}

/// Whole days elapsed between two UTC instants, duration-based (not a
/// calendar-day difference). Activity timestamps in the future count as
/// zero days.
pub fn days_elapsed(now: DateTime<Utc>, since: DateTime<Utc>) -> i64 {
    (now - since).num_days().max(0)
}

/// Staleness ratio: elapsed whole days divided by the configured period.
///
/// A zero period means the project is maximally stale: the function
/// returns positive infinity rather than dividing, and such a project
/// sorts first in any ratio-descending ranking.
pub fn ratio(period_days: u32, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    if period_days == 0 {
        return f64::INFINITY;
    }
    days_elapsed(now, last_activity) as f64 / f64::from(period_days)
}

/// Severity band derived from the staleness ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Ratio below 1.0 — within the configured cadence.
    Mild,
    /// Ratio in `[1.0, 1.5)`.
    Moderate,
    /// Ratio in `[1.5, 2.0)`.
    High,
    /// Ratio ≥ 2.0 (including infinity for zero-period projects).
    Critical,
}

impl Severity {
    /// Band for a given ratio.
    pub fn for_ratio(ratio: f64) -> Self {
        if ratio >= 2.0 {
            Self::Critical
        } else if ratio >= 1.5 {
            Self::High
        } else if ratio >= 1.0 {
            Self::Moderate
        } else {
            Self::Mild
        }
    }

    /// Marker glyph used in rendered digests.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Mild => "🟢",
            Self::Moderate => "🟡",
            Self::High => "🟠",
            Self::Critical => "🔴",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::model::{TaskId, TaskStatus};
    use chrono::TimeZone;

    fn project(period_days: u32, updated_at: DateTime<Utc>) -> Project {
        Project {
            id: 1,
            name: "alpha".to_owned(),
            owner_id: 1,
            period_days,
            updated_at,
        }
    }

    fn done_task(id: TaskId, completed_at: Option<DateTime<Utc>>) -> Task {
        Task {
            id,
            project_id: 1,
            title: format!("task {id}"),
            status: TaskStatus::Done,
            completed_at,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn last_activity_is_project_update_when_no_completions() {
        let updated = at(2025, 3, 1);
        let p = project(7, updated);
        assert_eq!(last_activity(&p, &[]), updated);
        assert_eq!(last_activity(&p, &[done_task(1, None)]), updated);
    }

    #[test]
    fn last_activity_takes_latest_completion() {
        let p = project(7, at(2025, 3, 1));
        let tasks = vec![
            done_task(1, Some(at(2025, 3, 5))),
            done_task(2, Some(at(2025, 3, 3))),
        ];
        assert_eq!(last_activity(&p, &tasks), at(2025, 3, 5));
    }

    #[test]
    fn last_activity_never_below_project_update() {
        let p = project(7, at(2025, 3, 10));
        let tasks = vec![done_task(1, Some(at(2025, 3, 2)))];
        assert_eq!(last_activity(&p, &tasks), p.updated_at);
    }

    #[test]
    fn days_elapsed_truncates_whole_days() {
        let since = at(2025, 3, 1);
        // 2 days 11 hours later truncates to 2.
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 23, 0, 0).unwrap();
        assert_eq!(days_elapsed(now, since), 2);
    }

    #[test]
    fn days_elapsed_clamps_future_activity_to_zero() {
        assert_eq!(days_elapsed(at(2025, 3, 1), at(2025, 3, 5)), 0);
    }

    #[test]
    fn ratio_is_days_over_period() {
        let r = ratio(7, at(2025, 3, 1), at(2025, 3, 11));
        assert!((r - 10.0 / 7.0).abs() < 1e-9);
        assert_eq!(Severity::for_ratio(r), Severity::Moderate);
    }

    #[test]
    fn ratio_monotonic_in_elapsed_days() {
        let since = at(2025, 3, 1);
        let mut prev = ratio(7, since, since);
        for day in 1..30 {
            let now = since + chrono::Duration::days(day);
            let r = ratio(7, since, now);
            assert!(r >= prev);
            prev = r;
        }
    }

    #[test]
    fn zero_period_is_infinitely_stale() {
        let r = ratio(0, at(2025, 3, 1), at(2025, 3, 1));
        assert!(r.is_infinite() && r.is_sign_positive());
        assert_eq!(Severity::for_ratio(r), Severity::Critical);
        // Sorts ahead of any finite ratio.
        assert!(r > ratio(1, at(2020, 1, 1), at(2025, 3, 1)));
    }

    #[test]
    fn severity_band_boundaries() {
        assert_eq!(Severity::for_ratio(0.0), Severity::Mild);
        assert_eq!(Severity::for_ratio(0.99), Severity::Mild);
        assert_eq!(Severity::for_ratio(1.0), Severity::Moderate);
        assert_eq!(Severity::for_ratio(1.49), Severity::Moderate);
        assert_eq!(Severity::for_ratio(1.5), Severity::High);
        assert_eq!(Severity::for_ratio(2.0), Severity::Critical);
    }
}
