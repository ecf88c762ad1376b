//! Persisted JSON shape of a subscription and its migration.
//!
//! Stored records use camel-case keys and may carry legacy fields
//! (`reminderDays`/`reminderHours`) or keys this crate does not know about.
//! Unknown keys are kept in `extra` so a rewrite never drops them.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::record::{clamp_reminder, SubscriptionRecord};
use crate::core::ReminderError;
use crate::features::recurrence::{Period, PeriodUnit};
use crate::features::reminders::{ReminderSetting, ReminderUnit};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredSubscription {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    pub expiry_date: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub period_value: Option<i64>,
    pub period_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_unit: Option<String>,
    #[serde(deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub reminder_value: Option<i64>,
    #[serde(deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub reminder_days: Option<i64>,
    #[serde(deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub reminder_hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_lunar: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredSubscription {
    /// Collapse the current and legacy reminder fields into one setting
    pub fn reminder_setting(&self) -> ReminderSetting {
        let is_hour = self
            .reminder_unit
            .as_deref()
            .and_then(|u| u.parse::<ReminderUnit>().ok())
            == Some(ReminderUnit::Hour);

        if is_hour {
            let value = self.reminder_value.or(self.reminder_hours);
            ReminderSetting::hours(clamp_reminder(value, 0))
        } else {
            let value = self.reminder_value.or(self.reminder_days);
            ReminderSetting::days(clamp_reminder(value, 7))
        }
    }
}

/// Accepts RFC 3339 instants and bare `YYYY-MM-DD` dates (read as UTC midnight)
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

impl TryFrom<StoredSubscription> for SubscriptionRecord {
    type Error = ReminderError;

    fn try_from(stored: StoredSubscription) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| ReminderError::InvalidRecord {
            id: stored.id.clone(),
            reason: reason.to_string(),
        };

        if stored.id.trim().is_empty() {
            return Err(invalid("missing id"));
        }
        let expiry = stored
            .expiry_date
            .as_deref()
            .and_then(parse_instant)
            .ok_or_else(|| invalid("missing or unreadable expiryDate"))?;

        let unit = match stored.period_unit.as_deref() {
            None => PeriodUnit::Month,
            Some(raw) => raw
                .parse::<PeriodUnit>()
                .map_err(|_| invalid("unknown periodUnit"))?,
        };
        let period = Period::new(stored.period_value.unwrap_or(1), unit)?;
        let reminder = stored.reminder_setting();

        Ok(SubscriptionRecord {
            id: stored.id.clone(),
            name: stored.name.clone(),
            custom_type: stored.custom_type.clone().filter(|s| !s.trim().is_empty()),
            category: stored.category.clone().filter(|s| !s.trim().is_empty()),
            tags: stored.tags.clone(),
            notes: stored.notes.clone().filter(|s| !s.trim().is_empty()),
            start_date: stored.start_date.as_deref().and_then(parse_instant),
            expiry,
            period,
            reminder,
            use_lunar: stored.use_lunar.unwrap_or(false),
            auto_renew: stored.auto_renew.unwrap_or(true),
            is_active: stored.is_active.unwrap_or(true),
            created_at: stored.created_at.as_deref().and_then(parse_instant),
            updated_at: stored.updated_at.as_deref().and_then(parse_instant),
        })
    }
}

impl From<&SubscriptionRecord> for StoredSubscription {
    fn from(record: &SubscriptionRecord) -> Self {
        let reminder = record.reminder;
        let (reminder_days, reminder_hours) = match reminder.unit {
            ReminderUnit::Day => (Some(i64::from(reminder.value)), None),
            ReminderUnit::Hour => (None, Some(i64::from(reminder.value))),
        };

        StoredSubscription {
            id: record.id.clone(),
            name: record.name.clone(),
            custom_type: record.custom_type.clone(),
            category: record.category.clone(),
            tags: record.tags.clone(),
            notes: record.notes.clone(),
            start_date: record.start_date.map(format_instant),
            expiry_date: Some(format_instant(record.expiry)),
            period_value: Some(i64::from(record.period.value())),
            period_unit: Some(record.period.unit().to_string()),
            reminder_unit: Some(reminder.unit.to_string()),
            reminder_value: Some(i64::from(reminder.value)),
            reminder_days,
            reminder_hours,
            use_lunar: Some(record.use_lunar),
            auto_renew: Some(record.auto_renew),
            is_active: Some(record.is_active),
            created_at: record.created_at.map(format_instant),
            updated_at: record.updated_at.map(format_instant),
            extra: Map::new(),
        }
    }
}

/// Numbers stored by older clients may be strings or floats
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(json: &str) -> StoredSubscription {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_legacy_reminder_days() {
        let sub = stored(r#"{"id":"1","name":"a","expiryDate":"2024-01-01","reminderDays":3}"#);
        assert_eq!(sub.reminder_setting(), ReminderSetting::days(3));
    }

    #[test]
    fn test_reminder_value_wins_over_legacy() {
        let sub = stored(
            r#"{"id":"1","reminderUnit":"hour","reminderValue":"5","reminderHours":9}"#,
        );
        assert_eq!(sub.reminder_setting(), ReminderSetting::hours(5));
        let sub = stored(r#"{"id":"1","reminderUnit":"hour","reminderHours":9}"#);
        assert_eq!(sub.reminder_setting(), ReminderSetting::hours(9));
    }

    #[test]
    fn test_reminder_defaults_and_clamp() {
        assert_eq!(stored(r#"{"id":"1"}"#).reminder_setting(), ReminderSetting::days(7));
        assert_eq!(
            stored(r#"{"id":"1","reminderUnit":"hour"}"#).reminder_setting(),
            ReminderSetting::hours(0)
        );
        assert_eq!(
            stored(r#"{"id":"1","reminderValue":-2}"#).reminder_setting(),
            ReminderSetting::days(0)
        );
        assert_eq!(
            stored(r#"{"id":"1","reminderUnit":"week","reminderDays":2}"#).reminder_setting(),
            ReminderSetting::days(2)
        );
    }

    #[test]
    fn test_migrates_to_record_with_defaults() {
        let record = SubscriptionRecord::try_from(stored(
            r#"{"id":1712000000000,"name":"Gym","expiryDate":"2024-01-31T00:00:00.000Z"}"#,
        ))
        .unwrap();
        assert_eq!(record.id, "1712000000000");
        assert_eq!(record.period, Period::new(1, PeriodUnit::Month).unwrap());
        assert!(record.auto_renew);
        assert!(record.is_active);
        assert!(!record.use_lunar);
        assert_eq!(record.expiry.to_rfc3339(), "2024-01-31T00:00:00+00:00");
    }

    #[test]
    fn test_zero_period_is_invalid() {
        let result = SubscriptionRecord::try_from(stored(
            r#"{"id":"1","expiryDate":"2024-01-31T00:00:00Z","periodValue":0,"periodUnit":"day"}"#,
        ));
        assert_eq!(result, Err(ReminderError::InvalidPeriod { value: 0 }));
    }

    #[test]
    fn test_missing_expiry_is_invalid() {
        let result = SubscriptionRecord::try_from(stored(r#"{"id":"1","name":"x"}"#));
        assert!(matches!(result, Err(ReminderError::InvalidRecord { .. })));
    }

    #[test]
    fn test_unknown_fields_survive() {
        let sub = stored(r#"{"id":"1","expiryDate":"2024-01-31","color":"blue"}"#);
        assert_eq!(sub.extra.get("color"), Some(&Value::String("blue".to_string())));
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["color"], "blue");
    }

    #[test]
    fn test_record_to_stored_shape() {
        let record = SubscriptionRecord::try_from(stored(
            r#"{"id":"7","name":"Domain","expiryDate":"2025-06-01T08:00:00Z","periodValue":1,"periodUnit":"year","reminderUnit":"hour","reminderValue":12,"useLunar":true,"autoRenew":false}"#,
        ))
        .unwrap();
        let json = serde_json::to_value(StoredSubscription::from(&record)).unwrap();
        assert_eq!(json["expiryDate"], "2025-06-01T08:00:00.000Z");
        assert_eq!(json["periodUnit"], "year");
        assert_eq!(json["reminderUnit"], "hour");
        assert_eq!(json["reminderHours"], 12);
        assert_eq!(json["useLunar"], true);
        assert_eq!(json["autoRenew"], false);
        assert!(json.get("reminderDays").is_none());
    }
}
