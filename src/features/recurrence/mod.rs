//! # Feature: Recurrence
//!
//! Periods and next-occurrence arithmetic on the solar and lunar calendars.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Step from the first anchor so clamped month ends recover
//! - 1.0.0: Initial release

pub mod advancer;
pub mod period;

pub use advancer::{
    advance_lunar, advance_solar, advance_until_future, Advancement, RecurringDate,
};
pub use period::{Period, PeriodUnit};
