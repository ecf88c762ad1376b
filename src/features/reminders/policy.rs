//! Reminder window decision

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit a reminder lead time counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderUnit {
    #[default]
    Day,
    Hour,
}

impl fmt::Display for ReminderUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderUnit::Day => write!(f, "day"),
            ReminderUnit::Hour => write!(f, "hour"),
        }
    }
}

impl std::str::FromStr for ReminderUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "days" => Ok(ReminderUnit::Day),
            "hour" | "hours" => Ok(ReminderUnit::Hour),
            _ => Err(anyhow::anyhow!("Invalid reminder unit: {}", s)),
        }
    }
}

/// How far ahead of expiry a reminder starts firing.
///
/// A value of 0 means "at the due instant", not "never".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderSetting {
    pub unit: ReminderUnit,
    pub value: u32,
}

impl Default for ReminderSetting {
    fn default() -> Self {
        Self {
            unit: ReminderUnit::Day,
            value: 7,
        }
    }
}

impl ReminderSetting {
    pub fn new(unit: ReminderUnit, value: u32) -> Self {
        Self { unit, value }
    }

    pub fn days(value: u32) -> Self {
        Self::new(ReminderUnit::Day, value)
    }

    pub fn hours(value: u32) -> Self {
        Self::new(ReminderUnit::Hour, value)
    }

    /// Human readable strategy, e.g. `3 days before` or `at expiry only`
    pub fn describe(&self) -> String {
        match (self.unit, self.value) {
            (_, 0) => "at expiry only".to_string(),
            (ReminderUnit::Day, 1) => "1 day before".to_string(),
            (ReminderUnit::Day, n) => format!("{} days before", n),
            (ReminderUnit::Hour, 1) => "1 hour before (hourly)".to_string(),
            (ReminderUnit::Hour, n) => format!("{} hours before (hourly)", n),
        }
    }
}

/// Whether a record with the given remaining time is inside its reminder window
pub fn should_notify(reminder: &ReminderSetting, days_remaining: i64, hours_remaining: f64) -> bool {
    let value = reminder.value;
    match reminder.unit {
        ReminderUnit::Day if value == 0 => days_remaining == 0,
        ReminderUnit::Day => (0..=i64::from(value)).contains(&days_remaining),
        ReminderUnit::Hour if value == 0 => (0.0..1.0).contains(&hours_remaining),
        ReminderUnit::Hour => (0.0..=f64::from(value)).contains(&hours_remaining),
    }
}
