//! Notification hour gate

use anyhow::{anyhow, Result};
use chrono::{DateTime, Timelike, Utc};
use std::collections::BTreeSet;
use std::fmt;

/// UTC hours during which a tick may send its batch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NotificationHours {
    #[default]
    Any,
    Hours(BTreeSet<u32>),
}

impl NotificationHours {
    /// Parse configured entries: blank entries are ignored, `*` or `ALL`
    /// allows every hour, anything else must be an hour 0-23 (`"8"` and
    /// `"08"` are the same hour). No entries means no restriction.
    pub fn parse(entries: &[String]) -> Result<Self> {
        let mut hours = BTreeSet::new();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if entry == "*" || entry.eq_ignore_ascii_case("all") {
                return Ok(NotificationHours::Any);
            }
            let hour: u32 = entry
                .parse()
                .map_err(|_| anyhow!("Invalid notification hour: {}", entry))?;
            if hour > 23 {
                return Err(anyhow!("Notification hour out of range: {}", entry));
            }
            hours.insert(hour);
        }

        if hours.is_empty() {
            Ok(NotificationHours::Any)
        } else {
            Ok(NotificationHours::Hours(hours))
        }
    }

    /// Whether the UTC hour of `now` is allowed
    pub fn allows(&self, now: DateTime<Utc>) -> bool {
        match self {
            NotificationHours::Any => true,
            NotificationHours::Hours(hours) => hours.contains(&now.hour()),
        }
    }
}

impl fmt::Display for NotificationHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationHours::Any => write!(f, "any hour"),
            NotificationHours::Hours(hours) => {
                let list: Vec<String> = hours.iter().map(|h| format!("{:02}", h)).collect();
                write!(f, "{} UTC", list.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_empty_and_wildcards_allow_everything() {
        assert_eq!(NotificationHours::parse(&[]).unwrap(), NotificationHours::Any);
        assert_eq!(
            NotificationHours::parse(&entries(&["", "  "])).unwrap(),
            NotificationHours::Any
        );
        assert_eq!(
            NotificationHours::parse(&entries(&["08", "*"])).unwrap(),
            NotificationHours::Any
        );
        assert_eq!(
            NotificationHours::parse(&entries(&["all"])).unwrap(),
            NotificationHours::Any
        );
    }

    #[test]
    fn test_explicit_hours_gate_on_utc_hour() {
        let hours = NotificationHours::parse(&entries(&["08", " 20 "])).unwrap();
        assert!(hours.allows(at("2024-03-15T08:59:00Z")));
        assert!(!hours.allows(at("2024-03-15T09:00:00Z")));
        // 20:30 in Shanghai is 12:30 UTC
        assert!(!hours.allows(at("2024-03-15T20:30:00+08:00")));
        assert!(hours.allows(at("2024-03-15T20:30:00Z")));
    }

    #[test]
    fn test_single_digit_hour() {
        let hours = NotificationHours::parse(&entries(&["8"])).unwrap();
        assert!(hours.allows(at("2024-03-15T08:00:00Z")));
    }

    #[test]
    fn test_rejects_bad_entries() {
        assert!(NotificationHours::parse(&entries(&["25"])).is_err());
        assert!(NotificationHours::parse(&entries(&["noon"])).is_err());
        assert!(NotificationHours::parse(&entries(&["-1"])).is_err());
    }

    #[test]
    fn test_display() {
        let hours = NotificationHours::parse(&entries(&["20", "8"])).unwrap();
        assert_eq!(hours.to_string(), "08, 20 UTC");
        assert_eq!(NotificationHours::Any.to_string(), "any hour");
    }
}
