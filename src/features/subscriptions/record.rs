//! Subscription records and create/edit validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{EngineResult, ReminderError};
use crate::features::clock::CalendarClock;
use crate::features::lunar::LunarDate;
use crate::features::recurrence::{advance_until_future, Period, PeriodUnit, RecurringDate};
use crate::features::reminders::{ReminderSetting, ReminderUnit};

/// A recurring item tracked for expiry.
///
/// `expiry` is always an absolute instant. `use_lunar` only changes how the
/// next occurrence is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub name: String,
    pub custom_type: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry: DateTime<Utc>,
    pub period: Period,
    pub reminder: ReminderSetting,
    pub use_lunar: bool,
    pub auto_renew: bool,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Where a record stands relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Expired { days_overdue: i64 },
    DueToday,
    Upcoming { days: i64 },
}

impl ExpiryStatus {
    pub fn from_days(days_remaining: i64) -> Self {
        match days_remaining {
            0 => ExpiryStatus::DueToday,
            d if d < 0 => ExpiryStatus::Expired { days_overdue: -d },
            d => ExpiryStatus::Upcoming { days: d },
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ExpiryStatus::Expired { .. } => "🚨",
            ExpiryStatus::DueToday => "⚠️",
            ExpiryStatus::Upcoming { .. } => "📅",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ExpiryStatus::Expired { days_overdue } => format!("expired {} days ago", days_overdue),
            ExpiryStatus::DueToday => "expires today!".to_string(),
            ExpiryStatus::Upcoming { days } => format!("expires in {} days", days),
        }
    }
}

impl SubscriptionRecord {
    /// Calendar date of the expiry in `clock`'s timezone, read in the
    /// record's calendar system
    pub fn anchor(&self, clock: &CalendarClock) -> EngineResult<RecurringDate> {
        RecurringDate::from_solar(clock.local_date(self.expiry), self.use_lunar)
    }

    /// Whole calendar days from `now` to the expiry date
    pub fn days_remaining(&self, clock: &CalendarClock, now: DateTime<Utc>) -> i64 {
        clock.whole_days_between(now, self.expiry)
    }

    /// Status regardless of `is_active`
    pub fn status(&self, clock: &CalendarClock, now: DateTime<Utc>) -> ExpiryStatus {
        ExpiryStatus::from_days(self.days_remaining(clock, now))
    }

    /// Lunar reading of the expiry date, if it is in range
    pub fn lunar_expiry(&self, clock: &CalendarClock) -> Option<LunarDate> {
        LunarDate::from_solar(clock.local_date(self.expiry)).ok()
    }

    /// Copy with the active flag toggled
    pub fn with_active(&self, is_active: bool, now: DateTime<Utc>) -> Self {
        Self {
            is_active,
            updated_at: Some(now),
            ..self.clone()
        }
    }

    /// Copy carrying a renewed expiry
    pub fn with_expiry(&self, expiry: DateTime<Utc>) -> Self {
        Self {
            expiry,
            ..self.clone()
        }
    }
}

/// Input for creating a record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSubscription {
    pub name: String,
    pub custom_type: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub period_value: Option<i64>,
    pub period_unit: Option<PeriodUnit>,
    pub reminder_unit: Option<ReminderUnit>,
    pub reminder_value: Option<i64>,
    pub use_lunar: bool,
    pub auto_renew: Option<bool>,
    pub is_active: Option<bool>,
}

impl NewSubscription {
    /// Validate and build a record.
    ///
    /// Rejects a missing name or expiry, a period below 1 and lunar dates
    /// outside the table. An expiry already in the past is rolled forward by
    /// whole periods so the record starts in the future.
    pub fn into_record(self, clock: &CalendarClock, now: DateTime<Utc>) -> EngineResult<SubscriptionRecord> {
        let id = Uuid::new_v4().to_string();
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ReminderError::InvalidRecord {
                id,
                reason: "name is required".to_string(),
            });
        }
        let expiry = self.expiry_date.ok_or_else(|| ReminderError::InvalidRecord {
            id: id.clone(),
            reason: "expiry date is required".to_string(),
        })?;

        let period = Period::new(
            self.period_value.unwrap_or(1),
            self.period_unit.unwrap_or(PeriodUnit::Month),
        )?;

        let expiry = roll_forward(expiry, period, self.use_lunar, clock, now)?;
        let reminder = resolve_reminder(self.reminder_unit.unwrap_or_default(), self.reminder_value);

        Ok(SubscriptionRecord {
            id,
            name,
            custom_type: non_blank(self.custom_type),
            category: non_blank(self.category),
            tags: clean_tags(self.tags),
            notes: non_blank(self.notes),
            start_date: self.start_date,
            expiry,
            period,
            reminder,
            use_lunar: self.use_lunar,
            auto_renew: self.auto_renew.unwrap_or(true),
            is_active: self.is_active.unwrap_or(true),
            created_at: Some(now),
            updated_at: None,
        })
    }
}

/// Input for editing an existing record.
///
/// `name` and `expiry_date` are required as on creation. `notes` and
/// `use_lunar` replace the stored values; every other field left unset keeps
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionUpdate {
    pub name: String,
    pub custom_type: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub period_value: Option<i64>,
    pub period_unit: Option<PeriodUnit>,
    pub reminder_unit: Option<ReminderUnit>,
    pub reminder_value: Option<i64>,
    pub use_lunar: bool,
    pub auto_renew: Option<bool>,
    pub is_active: Option<bool>,
}

impl SubscriptionUpdate {
    /// Validate the edit and return the updated copy of `current`.
    ///
    /// Applies the same checks and roll-forward as creation. A reminder
    /// unit or value left unset falls back to the stored one.
    pub fn apply(
        &self,
        current: &SubscriptionRecord,
        clock: &CalendarClock,
        now: DateTime<Utc>,
    ) -> EngineResult<SubscriptionRecord> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ReminderError::InvalidRecord {
                id: current.id.clone(),
                reason: "name is required".to_string(),
            });
        }
        let expiry = self.expiry_date.ok_or_else(|| ReminderError::InvalidRecord {
            id: current.id.clone(),
            reason: "expiry date is required".to_string(),
        })?;

        let period = match (self.period_value, self.period_unit) {
            (None, None) => current.period,
            (value, unit) => Period::new(
                value.unwrap_or_else(|| i64::from(current.period.value())),
                unit.unwrap_or(current.period.unit()),
            )?,
        };

        let expiry = roll_forward(expiry, period, self.use_lunar, clock, now)?;
        let reminder = resolve_reminder(
            self.reminder_unit.unwrap_or(current.reminder.unit),
            self.reminder_value.or(Some(i64::from(current.reminder.value))),
        );

        Ok(SubscriptionRecord {
            id: current.id.clone(),
            name,
            custom_type: non_blank(self.custom_type.clone()).or_else(|| current.custom_type.clone()),
            category: match &self.category {
                Some(category) => non_blank(Some(category.clone())),
                None => current.category.clone(),
            },
            tags: match &self.tags {
                Some(tags) => clean_tags(tags.clone()),
                None => current.tags.clone(),
            },
            notes: non_blank(self.notes.clone()),
            start_date: self.start_date.or(current.start_date),
            expiry,
            period,
            reminder,
            use_lunar: self.use_lunar,
            auto_renew: self.auto_renew.unwrap_or(current.auto_renew),
            is_active: self.is_active.unwrap_or(current.is_active),
            created_at: current.created_at,
            updated_at: Some(now),
        })
    }
}

/// Roll an expiry in the past forward by whole periods, keeping its local time
fn roll_forward(
    expiry: DateTime<Utc>,
    period: Period,
    use_lunar: bool,
    clock: &CalendarClock,
    now: DateTime<Utc>,
) -> EngineResult<DateTime<Utc>> {
    let anchor = RecurringDate::from_solar(clock.local_date(expiry), use_lunar)?;
    let advancement = advance_until_future(anchor, period, now, clock)?;
    if advancement.steps == 0 {
        Ok(expiry)
    } else {
        Ok(clock.to_instant(advancement.solar, clock.local_time(expiry)))
    }
}

fn resolve_reminder(unit: ReminderUnit, value: Option<i64>) -> ReminderSetting {
    match unit {
        ReminderUnit::Day => ReminderSetting::days(clamp_reminder(value, 7)),
        ReminderUnit::Hour => ReminderSetting::hours(clamp_reminder(value, 0)),
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub(crate) fn clamp_reminder(value: Option<i64>, fallback: u32) -> u32 {
    match value {
        Some(v) => v.clamp(0, i64::from(u32::MAX)) as u32,
        None => fallback,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
