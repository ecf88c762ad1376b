//! # Feature: Reminders
//!
//! Reminder windows, notification-hour gating, per-tick expiry evaluation
//! with auto-renewal, and the scheduler loop that drives it.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Hour-level reminders, lunar-aware auto-renewal, per-record failure isolation
//! - 1.0.0: Initial release with day-level reminders

pub mod engine;
pub mod hours;
pub mod policy;
pub mod scheduler;

pub use engine::{DueSubscription, ExpiryScheduler, RecordFailure, Renewal, TickOutcome};
pub use hours::NotificationHours;
pub use policy::{should_notify, ReminderSetting, ReminderUnit};
pub use scheduler::ReminderScheduler;
