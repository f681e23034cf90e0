//! Daily digest aggregation.
//!
//! A [`Digest`] is a transient value computed on every request or
//! scheduler tick from one batched repository read. It has no identity
//! and is never persisted.

pub mod format;

use crate::config::ReminderConfig;
use crate::error::{Result, TallyError};
use crate::model::{OwnerId, Project, Task, TaskStatus};
use crate::repo::Repository;
use crate::staleness;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// A project with the tasks it completed since UTC midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedEntry {
    pub project: Project,
    pub tasks: Vec<Task>,
}

/// A project with a count of its not-yet-done tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub project: Project,
    pub pending_count: usize,
}

/// A project whose staleness ratio crossed the attention threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionEntry {
    pub project: Project,
    pub ratio: f64,
    /// Whole days since the project's last activity.
    pub days_since_activity: i64,
}

/// One owner's computed summary for "today".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub owner_id: OwnerId,
    pub total_projects: usize,
    pub completed_today: Vec<CompletedEntry>,
    pub pending: Vec<PendingEntry>,
    /// Sorted by ratio descending, ties by project id ascending.
    pub attention: Vec<AttentionEntry>,
    pub generated_at: DateTime<Utc>,
}

impl Digest {
    /// An all-empty digest; "no data" is a valid state, not an error.
    pub fn empty(owner_id: OwnerId, generated_at: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            total_projects: 0,
            completed_today: Vec::new(),
            pending: Vec::new(),
            attention: Vec::new(),
            generated_at,
        }
    }

    /// True when every section is empty.
    pub fn is_empty(&self) -> bool {
        self.completed_today.is_empty() && self.pending.is_empty() && self.attention.is_empty()
    }

    /// Total tasks completed today across all projects.
    pub fn total_completed_today(&self) -> usize {
        self.completed_today.iter().map(|e| e.tasks.len()).sum()
    }

    /// Total not-yet-done tasks across all projects.
    pub fn total_pending(&self) -> usize {
        self.pending.iter().map(|e| e.pending_count).sum()
    }
}

/// Builds digests and reminder previews from a repository.
#[derive(Clone)]
pub struct DigestService {
    repo: Arc<dyn Repository>,
    attention_threshold: f64,
}

impl DigestService {
    pub fn new(repo: Arc<dyn Repository>, reminders: &ReminderConfig) -> Self {
        Self {
            repo,
            attention_threshold: reminders.stale_attention_threshold,
        }
    }

    /// Build the digest for one owner at a fixed instant.
    ///
    /// Fails with [`TallyError::OwnerNotFound`] for unknown owners; an
    /// owner with zero projects gets an empty digest. Deterministic:
    /// identical inputs and `now` yield structurally identical digests.
    pub async fn build_digest(&self, owner_id: OwnerId, now: DateTime<Utc>) -> Result<Digest> {
        self.repo
            .get_owner(owner_id)
            .await?
            .ok_or(TallyError::OwnerNotFound(owner_id))?;

        let projects = self.repo.get_projects_with_tasks(owner_id).await?;
        let today_start = now.with_time(NaiveTime::MIN).single().unwrap_or(now);

        let mut digest = Digest::empty(owner_id, now);
        digest.total_projects = projects.len();

        for entry in &projects {
            let completed_today: Vec<Task> = entry
                .tasks
                .iter()
                .filter(|t| {
                    t.status == TaskStatus::Done
                        && t.completed_at.is_some_and(|done| done >= today_start)
                })
                .cloned()
                .collect();
            let pending_count = entry
                .tasks
                .iter()
                .filter(|t| t.status != TaskStatus::Done)
                .count();

            if !completed_today.is_empty() {
                digest.completed_today.push(CompletedEntry {
                    project: entry.project.clone(),
                    tasks: completed_today,
                });
            }
            if pending_count > 0 {
                digest.pending.push(PendingEntry {
                    project: entry.project.clone(),
                    pending_count,
                });
            }

            let last_activity = staleness::last_activity(&entry.project, &entry.tasks);
            let ratio = staleness::ratio(entry.project.period_days, last_activity, now);
            if ratio >= self.attention_threshold {
                digest.attention.push(AttentionEntry {
                    project: entry.project.clone(),
                    ratio,
                    days_since_activity: staleness::days_elapsed(now, last_activity),
                });
            }
        }

        digest.attention.sort_by(|a, b| {
            b.ratio
                .partial_cmp(&a.ratio)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.project.id.cmp(&b.project.id))
        });

        Ok(digest)
    }

    /// On-demand "show me today" summary.
    pub async fn get_summary(&self, owner_id: OwnerId) -> Result<Digest> {
        self.build_digest(owner_id, Utc::now()).await
    }

    /// Rendered reminder text as the scheduler would deliver it now.
    pub async fn get_reminder_preview(&self, owner_id: OwnerId) -> Result<String> {
        let digest = self.build_digest(owner_id, Utc::now()).await?;
        Ok(format::render_reminder(&digest))
    }
}
