//! Tally: staleness-aware project digest and reminder engine.
//!
//! Computes a per-project staleness ratio from last-activity timestamps
//! and a configured cadence, aggregates per-owner daily digests, and
//! runs a background scheduler that delivers each owner's digest once a
//! day at their local wall-clock reminder time.
//!
//! # Architecture
//!
//! Data flows from the scheduler tick outward:
//! - **Scheduler**: fixed-interval due check across all owners
//! - **Digest**: one batched repository read, staleness math per project
//! - **Format**: full summary and short reminder renderings
//! - **Notifier**: injected transport; delivery failures are isolated
//!   per owner
//!
//! Persistence and transports stay outside the crate behind the
//! [`repo::Repository`], [`repo::SettingsStore`], and
//! [`notify::Notifier`] contracts.

pub mod config;
pub mod digest;
pub mod error;
pub mod model;
pub mod notify;
pub mod repo;
pub mod scheduler;
pub mod settings;
pub mod staleness;

pub use config::TallyConfig;
pub use digest::{Digest, DigestService};
pub use error::{Result, TallyError};
pub use notify::Notifier;
pub use repo::{MemoryRepository, Repository, SettingsStore};
pub use scheduler::{ReminderScheduler, SchedulerHandle, SchedulerState};
