//! Reminder scheduler background loop.
//!
//! Spawns a tokio task that wakes on a fixed interval, finds owners
//! whose local wall-clock reminder time matches the current minute, and
//! delivers a rendered reminder to each through the injected notifier.

use crate::config::TallyConfig;
use crate::digest::{DigestService, format};
use crate::error::{Result, TallyError};
use crate::model::{NotificationSettings, Owner};
use crate::notify::Notifier;
use crate::repo::{Repository, SettingsStore};
use crate::scheduler::due;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Scheduler lifecycle state. Only `Running` permits ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    /// Stop requested; the in-flight tick may still be finishing.
    Stopping,
}

/// Background scheduler that delivers daily reminder digests.
///
/// Delivery semantics are at-most-once per one-minute window: firing is
/// a point-in-time equality check evaluated once per tick, and nothing
/// persists an "already sent today" marker. A restart or a stalled tick
/// straddling the target minute skips that day's reminder; shortening
/// the interval below the minute window can double-fire. Embedders who
/// need exactly-once must keep a last-sent ledger outside this crate.
pub struct ReminderScheduler {
    repo: Arc<dyn Repository>,
    settings: Arc<dyn SettingsStore>,
    notifier: Arc<dyn Notifier>,
    digests: DigestService,
    config: TallyConfig,
}

/// Handle to a started scheduler; stopping consumes it.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    state_tx: Arc<watch::Sender<SchedulerState>>,
    state_rx: watch::Receiver<SchedulerState>,
    grace: Duration,
}

impl SchedulerHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Request a stop and wait for the loop to exit.
    ///
    /// The in-flight tick is allowed to finish; the wait is bounded by
    /// the configured grace period, after which the scheduler is
    /// reported unresponsive instead of blocking the caller.
    pub async fn stop(self) -> Result<()> {
        let _ = self.state_tx.send(SchedulerState::Stopping);
        self.cancel.cancel();
        match tokio::time::timeout(self.grace, self.join).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TallyError::Scheduler(format!(
                "scheduler task panicked: {e}"
            ))),
            Err(_) => Err(TallyError::Scheduler(format!(
                "scheduler did not stop within {}s",
                self.grace.as_secs()
            ))),
        }
    }
}

impl ReminderScheduler {
    pub fn new(
        repo: Arc<dyn Repository>,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
        config: TallyConfig,
    ) -> Self {
        let digests = DigestService::new(Arc::clone(&repo), &config.reminders);
        Self {
            repo,
            settings,
            notifier,
            digests,
            config,
        }
    }

    /// Start the background loop and return its handle.
    pub fn start(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(SchedulerState::Stopped);
        let state_tx = Arc::new(state_tx);
        let grace = Duration::from_secs(self.config.scheduler.stop_grace_secs.max(1));

        let loop_cancel = cancel.clone();
        let loop_state = Arc::clone(&state_tx);
        let join = tokio::spawn(async move {
            self.run_loop(loop_cancel, loop_state).await;
        });

        SchedulerHandle {
            cancel,
            join,
            state_tx,
            state_rx,
            grace,
        }
    }

    async fn run_loop(
        self,
        cancel: CancellationToken,
        state_tx: Arc<watch::Sender<SchedulerState>>,
    ) {
        let _ = state_tx.send(SchedulerState::Running);
        let tick_secs = self.config.scheduler.check_interval_secs.max(1);
        info!("reminder scheduler started (tick every {tick_secs}s)");

        // Ticks never overlap: the next wake is delayed until the
        // current per-owner pass has finished.
        let mut interval = tokio::time::interval(Duration::from_secs(tick_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let now = Utc::now();
            match self.run_tick(now, &cancel).await {
                Ok(0) => {}
                Ok(sent) => info!("tick delivered {sent} reminders"),
                Err(TallyError::Repository(e)) => {
                    // Whole tick abandoned; back off before re-polling a
                    // down dependency.
                    warn!("tick abandoned, repository unavailable: {e}");
                    let backoff =
                        Duration::from_secs(self.config.scheduler.repo_backoff_secs.max(1));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(e) => error!("tick failed: {e}"),
            }
        }

        let _ = state_tx.send(SchedulerState::Stopped);
        info!("reminder scheduler stopped");
    }

    /// Run a single due-check pass at a fixed instant.
    ///
    /// Returns the number of reminders delivered. Public so interactive
    /// "send now" commands and tests can drive the scheduler without
    /// waiting for the wall clock.
    pub async fn tick_once(&self, now: DateTime<Utc>) -> Result<usize> {
        self.run_tick(now, &CancellationToken::new()).await
    }

    async fn run_tick(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<usize> {
        let rows = self.repo.get_all_owners_with_settings().await?;

        let mut roster: Vec<(Owner, NotificationSettings)> = Vec::with_capacity(rows.len());
        for (owner, stored) in rows {
            let settings = match stored {
                Some(s) => s,
                None => self.resolve_missing_settings(&owner).await,
            };
            roster.push((owner, settings));
        }

        let due = due::owners_due_at(&roster, &self.config.reminders, now);
        if due.is_empty() {
            debug!("no owners due at {}", now.format("%H:%M UTC"));
            return Ok(0);
        }
        info!(
            "{} owners due for reminders at {}",
            due.len(),
            now.format("%H:%M UTC")
        );

        let pacing = Duration::from_millis(self.config.scheduler.send_pacing_ms);
        let mut sent = 0;
        for (owner, settings) in due {
            if cancel.is_cancelled() {
                break;
            }
            // One owner's failure never aborts the rest of the tick.
            match self.deliver(&owner, now).await {
                Ok(()) => {
                    sent += 1;
                    debug!(
                        "sent reminder to owner {} (time {}, tz {})",
                        owner.id, settings.reminder_time, settings.timezone
                    );
                }
                Err(e) => warn!("reminder delivery failed for owner {}: {e:#}", owner.id),
            }
            if !pacing.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pacing) => {}
                }
            }
        }
        Ok(sent)
    }

    /// Lazily create settings for an owner seen without a record,
    /// degrading to in-memory defaults when the store write fails.
    async fn resolve_missing_settings(&self, owner: &Owner) -> NotificationSettings {
        match self.settings.get_or_create(owner.id).await {
            Ok(s) => s,
            Err(e) => {
                warn!("cannot create settings for owner {}: {e}", owner.id);
                NotificationSettings::default()
            }
        }
    }

    async fn deliver(&self, owner: &Owner, now: DateTime<Utc>) -> anyhow::Result<()> {
        let digest = self.digests.build_digest(owner.id, now).await?;
        let text = format::render_reminder(&digest);
        self.notifier
            .send(&owner.recipient, &text, self.config.app_url.as_deref())
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::model::{OwnerId, Project, ProjectWithTasks, Task, TaskStatus};
    use crate::repo::MemoryRepository;
    use crate::settings::SettingsPatch;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(
            &self,
            recipient: &str,
            text: &str,
            _action_link: Option<&str>,
        ) -> anyhow::Result<()> {
            if self.fail_for.as_deref() == Some(recipient) {
                anyhow::bail!("transport rejected {recipient}");
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_owned(), text.to_owned()));
            Ok(())
        }
    }

    /// Repository whose every read fails, as when the backing store is
    /// unreachable.
    struct UnavailableRepository;

    #[async_trait]
    impl Repository for UnavailableRepository {
        async fn get_owner(&self, _owner_id: OwnerId) -> Result<Option<Owner>> {
            Err(TallyError::Repository("connection refused".to_owned()))
        }

        async fn get_projects_with_tasks(
            &self,
            _owner_id: OwnerId,
        ) -> Result<Vec<ProjectWithTasks>> {
            Err(TallyError::Repository("connection refused".to_owned()))
        }

        async fn get_all_owners_with_settings(
            &self,
        ) -> Result<Vec<(Owner, Option<NotificationSettings>)>> {
            Err(TallyError::Repository("connection refused".to_owned()))
        }
    }

    /// Settings store that rejects every write.
    struct RejectingSettingsStore;

    #[async_trait]
    impl SettingsStore for RejectingSettingsStore {
        async fn get_or_create(&self, owner_id: OwnerId) -> Result<NotificationSettings> {
            Err(TallyError::Settings(format!("store offline for owner {owner_id}")))
        }

        async fn update(
            &self,
            owner_id: OwnerId,
            _patch: SettingsPatch,
        ) -> Result<NotificationSettings> {
            Err(TallyError::Settings(format!("store offline for owner {owner_id}")))
        }
    }

    fn fast_config() -> TallyConfig {
        let mut config = TallyConfig::default();
        config.scheduler.send_pacing_ms = 0;
        config
    }

    fn scheduler_with(
        repo: &MemoryRepository,
        notifier: Arc<RecordingNotifier>,
        config: TallyConfig,
    ) -> ReminderScheduler {
        ReminderScheduler::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            notifier,
            config,
        )
    }

    fn add_owner(repo: &MemoryRepository, id: i64) {
        repo.insert_owner(Owner {
            id,
            recipient: format!("chat:{id}"),
        });
    }

    async fn set_reminder(repo: &MemoryRepository, id: i64, time: &str, zone: &str) {
        repo.update(
            id,
            SettingsPatch {
                reminder_time: Some(time.to_owned()),
                timezone: Some(zone.to_owned()),
                ..SettingsPatch::default()
            },
        )
        .await
        .unwrap();
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 11, h, m, 10).unwrap()
    }

    #[tokio::test]
    async fn tick_fires_owner_at_local_reminder_minute() {
        let repo = MemoryRepository::new();
        add_owner(&repo, 1);
        set_reminder(&repo, 1, "21:30", "Europe/Moscow").await;

        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(&repo, Arc::clone(&notifier), fast_config());

        // Moscow is UTC+3: 18:30 UTC matches, neighbors do not.
        assert_eq!(scheduler.tick_once(utc(18, 29)).await.unwrap(), 0);
        assert_eq!(scheduler.tick_once(utc(18, 30)).await.unwrap(), 1);
        assert_eq!(scheduler.tick_once(utc(18, 31)).await.unwrap(), 0);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "chat:1");
        assert!(sent[0].1.contains("Time to wrap up the day!"));
    }

    #[tokio::test]
    async fn owner_without_settings_gets_lazily_created_defaults() {
        let repo = MemoryRepository::new();
        add_owner(&repo, 1);

        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(&repo, Arc::clone(&notifier), fast_config());

        // Default reminder time is 20:00 UTC.
        assert_eq!(scheduler.tick_once(utc(20, 0)).await.unwrap(), 1);

        // The touch persisted a settings record.
        let rows = repo.get_all_owners_with_settings().await.unwrap();
        assert_eq!(rows[0].1, Some(NotificationSettings::default()));
    }

    #[tokio::test]
    async fn disabled_owner_is_skipped() {
        let repo = MemoryRepository::new();
        add_owner(&repo, 1);
        repo.update(
            1,
            SettingsPatch {
                reminders_enabled: Some(false),
                ..SettingsPatch::default()
            },
        )
        .await
        .unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(&repo, Arc::clone(&notifier), fast_config());
        assert_eq!(scheduler.tick_once(utc(20, 0)).await.unwrap(), 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failing_delivery_does_not_abort_the_tick() {
        let repo = MemoryRepository::new();
        add_owner(&repo, 1);
        add_owner(&repo, 2);
        set_reminder(&repo, 1, "12:00", "UTC").await;
        set_reminder(&repo, 2, "12:00", "UTC").await;

        let notifier = Arc::new(RecordingNotifier {
            fail_for: Some("chat:1".to_owned()),
            ..RecordingNotifier::default()
        });
        let scheduler = scheduler_with(&repo, Arc::clone(&notifier), fast_config());

        let sent = scheduler.tick_once(utc(12, 0)).await.unwrap();
        assert_eq!(sent, 1);
        let recorded = notifier.sent.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "chat:2");
    }

    #[tokio::test]
    async fn failed_bulk_read_abandons_the_tick_without_deliveries() {
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = ReminderScheduler::new(
            Arc::new(UnavailableRepository),
            Arc::new(MemoryRepository::new()),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            fast_config(),
        );

        let result = scheduler.tick_once(utc(20, 0)).await;
        assert!(matches!(result, Err(TallyError::Repository(_))));
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn settings_store_failure_degrades_owner_to_defaults() {
        let repo = MemoryRepository::new();
        add_owner(&repo, 1);

        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = ReminderScheduler::new(
            Arc::new(repo.clone()),
            Arc::new(RejectingSettingsStore),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            fast_config(),
        );

        // The owner is still considered under the in-memory defaults,
        // so the reminder fires at 20:00 UTC and nowhere else.
        assert_eq!(scheduler.tick_once(utc(19, 59)).await.unwrap(), 0);
        assert_eq!(scheduler.tick_once(utc(20, 0)).await.unwrap(), 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);

        // No settings record was persisted behind the failing store.
        let rows = repo.get_all_owners_with_settings().await.unwrap();
        assert!(rows[0].1.is_none());
    }

    #[tokio::test]
    async fn reminder_body_reflects_digest_contents() {
        let repo = MemoryRepository::new();
        add_owner(&repo, 1);
        set_reminder(&repo, 1, "12:00", "UTC").await;

        let now = utc(12, 0);
        repo.insert_project(Project {
            id: 10,
            name: "alpha".to_owned(),
            owner_id: 1,
            period_days: 7,
            updated_at: now - chrono::Duration::days(10),
        });
        repo.insert_task(Task {
            id: 1,
            project_id: 10,
            title: "ship it".to_owned(),
            status: TaskStatus::Todo,
            completed_at: None,
        });

        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(&repo, Arc::clone(&notifier), fast_config());
        assert_eq!(scheduler.tick_once(now).await.unwrap(), 1);

        let sent = notifier.sent.lock().unwrap();
        assert!(sent[0].1.contains("1 project needs your attention"));
        assert!(sent[0].1.contains("1 task still pending"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_stop_transitions_lifecycle_states() {
        let repo = MemoryRepository::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(&repo, notifier, fast_config());

        let handle = scheduler.start();
        // Let the loop reach its first tick.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.state(), SchedulerState::Running);

        handle.stop().await.unwrap();
    }
}
