//! Repository and settings-store contracts consumed by the digest engine.
//!
//! The engine never owns persistence. Backends implement these traits;
//! the in-memory implementation here backs tests and small embeddings.

use crate::error::{Result, TallyError};
use crate::model::{
    NotificationSettings, Owner, OwnerId, Project, ProjectWithTasks, Task,
};
use crate::settings::SettingsPatch;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Read access to owners, projects, and tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Resolve one owner by id.
    async fn get_owner(&self, owner_id: OwnerId) -> Result<Option<Owner>>;

    /// All projects owned by `owner_id`, each with its tasks embedded.
    ///
    /// Must be a single batched read; the aggregator issues exactly one
    /// call per digest and never one round-trip per project.
    async fn get_projects_with_tasks(&self, owner_id: OwnerId) -> Result<Vec<ProjectWithTasks>>;

    /// Every owner paired with their settings record, if one exists.
    async fn get_all_owners_with_settings(
        &self,
    ) -> Result<Vec<(Owner, Option<NotificationSettings>)>>;
}

/// Get-or-create and partial-update access to notification settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the owner's settings, creating the defaulted record on
    /// first access.
    async fn get_or_create(&self, owner_id: OwnerId) -> Result<NotificationSettings>;

    /// Apply a validated partial update and return the new record.
    async fn update(&self, owner_id: OwnerId, patch: SettingsPatch)
    -> Result<NotificationSettings>;
}

#[derive(Debug, Default)]
struct MemoryState {
    owners: BTreeMap<OwnerId, Owner>,
    projects: BTreeMap<i64, Project>,
    tasks: BTreeMap<i64, Task>,
    settings: BTreeMap<OwnerId, NotificationSettings>,
}

/// In-memory repository and settings store.
///
/// Snapshot consistency comes from holding the state lock for the whole
/// read. Clones share the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_owner(&self, owner: Owner) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.owners.insert(owner.id, owner);
    }

    pub fn insert_project(&self, project: Project) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.projects.insert(project.id, project);
    }

    pub fn insert_task(&self, task: Task) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.tasks.insert(task.id, task);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_owner(&self, owner_id: OwnerId) -> Result<Option<Owner>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.owners.get(&owner_id).cloned())
    }

    async fn get_projects_with_tasks(&self, owner_id: OwnerId) -> Result<Vec<ProjectWithTasks>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .map(|project| ProjectWithTasks {
                project: project.clone(),
                tasks: state
                    .tasks
                    .values()
                    .filter(|t| t.project_id == project.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn get_all_owners_with_settings(
        &self,
    ) -> Result<Vec<(Owner, Option<NotificationSettings>)>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .owners
            .values()
            .map(|owner| (owner.clone(), state.settings.get(&owner.id).cloned()))
            .collect())
    }
}

#[async_trait]
impl SettingsStore for MemoryRepository {
    async fn get_or_create(&self, owner_id: OwnerId) -> Result<NotificationSettings> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.owners.contains_key(&owner_id) {
            return Err(TallyError::OwnerNotFound(owner_id));
        }
        Ok(state.settings.entry(owner_id).or_default().clone())
    }

    async fn update(
        &self,
        owner_id: OwnerId,
        patch: SettingsPatch,
    ) -> Result<NotificationSettings> {
        patch.validate()?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.owners.contains_key(&owner_id) {
            return Err(TallyError::OwnerNotFound(owner_id));
        }
        let settings = state.settings.entry(owner_id).or_default();
        if let Some(enabled) = patch.reminders_enabled {
            settings.reminders_enabled = enabled;
        }
        if let Some(time) = patch.reminder_time {
            settings.reminder_time = time;
        }
        if let Some(zone) = patch.timezone {
            settings.timezone = zone;
        }
        Ok(settings.clone())
    }
}
