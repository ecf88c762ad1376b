//! Message bodies for reminder batches

use chrono::{DateTime, Utc};

use crate::core::SchedulerSettings;
use crate::features::clock::CalendarClock;
use crate::features::reminders::DueSubscription;
use crate::features::subscriptions::{ExpiryStatus, SubscriptionRecord};

pub const BATCH_TITLE: &str = "Subscription expiry reminder";

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn calendar_name(record: &SubscriptionRecord) -> &'static str {
    if record.use_lunar {
        "Lunar"
    } else {
        "Solar"
    }
}

fn expiry_line(record: &SubscriptionRecord, show_lunar: bool, clock: &CalendarClock) -> String {
    let mut line = format!("Expiry date: {}", clock.format_date(record.expiry));
    if show_lunar {
        if let Some(lunar) = record.lunar_expiry(clock) {
            line.push_str(&format!("\nLunar date: {}", lunar));
        }
    }
    line
}

fn footer(clock: &CalendarClock, now: DateTime<Utc>) -> String {
    format!(
        "Sent at: {}\nTimezone: {}",
        clock.format_datetime(now),
        clock.display_name(now)
    )
}

/// Body for one tick's batch, in the order given
pub fn format_batch(
    due: &[DueSubscription],
    settings: &SchedulerSettings,
    clock: &CalendarClock,
    now: DateTime<Utc>,
) -> String {
    let mut content = String::new();

    for item in due {
        let record = &item.record;
        let status: ExpiryStatus = item.status();

        content.push_str(&format!(
            "{} **{}**\nType: {} (every {})\nCategory: {}\nCalendar: {}\n{}\nAuto-renew: {}\nReminder: {}\nStatus: {}",
            status.emoji(),
            record.name,
            record.custom_type.as_deref().unwrap_or("Other"),
            record.period,
            record.category.as_deref().unwrap_or("Uncategorized"),
            calendar_name(record),
            expiry_line(record, settings.show_lunar, clock),
            yes_no(record.auto_renew),
            record.reminder.describe(),
            status.describe()
        ));
        if let Some(notes) = &record.notes {
            content.push_str(&format!("\nNotes: {}", notes));
        }
        content.push_str("\n\n");
    }

    content.push_str(&footer(clock, now));
    content
}

/// Title and body for a manual test of one record
pub fn format_test(
    record: &SubscriptionRecord,
    settings: &SchedulerSettings,
    clock: &CalendarClock,
    now: DateTime<Utc>,
) -> (String, String) {
    let title = format!("Test notification: {}", record.name);
    let body = format!(
        "**Subscription details**\nType: {}\nCalendar: {}\n{}\nAuto-renew: {}\nNotes: {}\n{}",
        record.custom_type.as_deref().unwrap_or("Other"),
        calendar_name(record),
        expiry_line(record, settings.show_lunar, clock),
        yes_no(record.auto_renew),
        record.notes.as_deref().unwrap_or("None"),
        footer(clock, now)
    );
    (title, body)
}

/// Tags for channel metadata: explicit tags, category parts and custom type,
/// in order of first appearance without duplicates
pub fn extract_tags<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a SubscriptionRecord>,
{
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    };

    for record in records {
        for tag in &record.tags {
            push(tag.as_str());
        }
        if let Some(category) = &record.category {
            category
                .split(|c: char| c == '/' || c == ',' || c == '，' || c.is_whitespace())
                .for_each(&mut push);
        }
        if let Some(custom_type) = &record.custom_type {
            push(custom_type.as_str());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::recurrence::{Period, PeriodUnit};
    use crate::features::reminders::ReminderSetting;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn record() -> SubscriptionRecord {
        SubscriptionRecord {
            id: "1".to_string(),
            name: "Netflix".to_string(),
            custom_type: Some("Streaming".to_string()),
            category: Some("media/video, family".to_string()),
            tags: vec!["video".to_string(), "shared".to_string()],
            notes: Some("Family plan".to_string()),
            start_date: None,
            expiry: at("2024-02-10T00:00:00Z"),
            period: Period::new(1, PeriodUnit::Month).unwrap(),
            reminder: ReminderSetting::days(3),
            use_lunar: true,
            auto_renew: true,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_extract_tags_dedupes_in_order() {
        let mut other = record();
        other.tags = vec!["family".to_string(), "work".to_string()];
        other.category = Some("work，tools".to_string());
        other.custom_type = None;

        let tags = extract_tags([&record(), &other]);
        assert_eq!(
            tags,
            vec!["video", "shared", "media", "family", "Streaming", "work", "tools"]
        );
    }

    #[test]
    fn test_format_batch() {
        let due = DueSubscription {
            record: record(),
            days_remaining: 2,
            hours_remaining: 48.0,
            renewed: false,
        };
        let settings = SchedulerSettings {
            show_lunar: true,
            ..Default::default()
        };
        let body = format_batch(
            &[due],
            &settings,
            &CalendarClock::utc(),
            at("2024-02-08T08:00:00Z"),
        );

        assert!(body.starts_with("📅 **Netflix**\nType: Streaming (every 1 month)\n"));
        assert!(body.contains("Category: media/video, family\n"));
        assert!(body.contains("Calendar: Lunar\n"));
        assert!(body.contains("Expiry date: 2024-02-10\nLunar date: 甲辰年正月初一\n"));
        assert!(body.contains("Reminder: 3 days before\nStatus: expires in 2 days\nNotes: Family plan\n\n"));
        assert!(body.ends_with("Sent at: 2024-02-08 08:00:00\nTimezone: UTC (UTC+0)"));
    }

    #[test]
    fn test_format_batch_expired_without_lunar() {
        let mut expired = record();
        expired.notes = None;
        expired.category = None;
        let due = DueSubscription {
            record: expired,
            days_remaining: -3,
            hours_remaining: -72.0,
            renewed: false,
        };
        let body = format_batch(
            &[due],
            &SchedulerSettings::default(),
            &CalendarClock::utc(),
            at("2024-02-13T00:00:00Z"),
        );
        assert!(body.starts_with("🚨 **Netflix**"));
        assert!(body.contains("Category: Uncategorized\n"));
        assert!(!body.contains("Lunar date"));
        assert!(body.contains("Status: expired 3 days ago\n\n"));
    }

    #[test]
    fn test_format_test_notification() {
        let (title, body) = format_test(
            &record(),
            &SchedulerSettings::default(),
            &CalendarClock::utc(),
            at("2024-02-08T08:00:00Z"),
        );
        assert_eq!(title, "Test notification: Netflix");
        assert!(body.starts_with("**Subscription details**\nType: Streaming\n"));
        assert!(body.contains("Notes: Family plan\nSent at: "));
    }
}
