// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure
pub mod database;

// Re-export core items
pub use crate::core::{Config, EngineResult, ReminderError, SchedulerSettings};

// Re-export feature items
pub use features::{
    // Calendar
    CalendarClock, LunarDate, Period, PeriodUnit, RecurringDate,
    // Notifications
    LogNotifier, Notifier, NotifierRegistry,
    // Reminders
    ExpiryScheduler, NotificationHours, ReminderScheduler, ReminderSetting, ReminderUnit,
    TickOutcome,
    // Subscriptions
    MemoryStore, NewSubscription, SubscriptionRecord, SubscriptionStore, SubscriptionUpdate,
};

pub use database::Database;
