//! # Features
//!
//! One directory per feature, each re-exporting its public items.

// Calendar
pub mod clock;
pub mod lunar;
pub mod recurrence;

// Subscriptions and reminders
pub mod notifications;
pub mod reminders;
pub mod subscriptions;

pub use clock::CalendarClock;
pub use lunar::{lunar_to_solar, solar_to_lunar, LunarDate};
pub use notifications::{LogNotifier, Notifier, NotifierRegistry};
pub use recurrence::{advance_lunar, advance_solar, advance_until_future, Period, PeriodUnit, RecurringDate};
pub use reminders::{
    should_notify, ExpiryScheduler, NotificationHours, ReminderScheduler, ReminderSetting,
    ReminderUnit, TickOutcome,
};
pub use subscriptions::{
    MemoryStore, NewSubscription, SubscriptionRecord, SubscriptionStore, SubscriptionUpdate,
};
