//! Background reminder scheduling.
//!
//! One scheduler task per process. Each tick enumerates owners, matches
//! their local wall-clock reminder time, and delivers digests through
//! the injected notifier.

pub mod due;
pub mod runner;

pub use runner::{ReminderScheduler, SchedulerHandle, SchedulerState};
