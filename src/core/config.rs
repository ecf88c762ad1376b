//! # Configuration
//!
//! Process settings come from the environment (optionally via `.env`).
//! Scheduler settings (timezone, notification hours, channels) can live in the
//! store, in a YAML file, or fall back to the environment.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: YAML settings file and legacy upper-case key aliases
//! - 1.0.0: Initial release with environment-only configuration

use anyhow::Result;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::env;

use crate::features::clock::CalendarClock;
use crate::features::reminders::NotificationHours;

const DEFAULT_TICK_INTERVAL_SECS: u64 = 3600;
const MIN_TICK_INTERVAL_SECS: u64 = 60;

/// Process-level configuration for the reminder service
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub log_level: String,
    pub tick_interval_secs: u64,
    pub settings_path: String,
    /// Used when neither the store nor the settings file provide settings
    pub default_settings: SchedulerSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tick_interval_secs = match env::var("TICK_INTERVAL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("Invalid TICK_INTERVAL_SECS '{}': {}", raw, e))?
                .max(MIN_TICK_INTERVAL_SECS),
            Err(_) => DEFAULT_TICK_INTERVAL_SECS,
        };

        let default_settings = SchedulerSettings {
            timezone: env::var("TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            notification_hours: env::var("NOTIFICATION_HOURS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            enabled_notifiers: env::var("ENABLED_NOTIFIERS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|_| vec!["log".to_string()]),
            show_lunar: env::var("SHOW_LUNAR")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };
        default_settings.validate()?;

        Ok(Config {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "reminders.db".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            tick_interval_secs,
            settings_path: env::var("SETTINGS_PATH")
                .unwrap_or_else(|_| "reminders.yaml".to_string()),
            default_settings,
        })
    }
}

/// Split a comma separated environment value, dropping empty entries
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Settings that drive a scheduler tick
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchedulerSettings {
    /// IANA timezone name or "UTC"
    #[serde(default = "default_timezone", alias = "TIMEZONE")]
    pub timezone: String,

    /// Two-digit UTC hours, "*" or "ALL"; empty means no restriction
    #[serde(
        default,
        alias = "NOTIFICATION_HOURS",
        deserialize_with = "lenient_hours"
    )]
    pub notification_hours: Vec<String>,

    /// Names of the channels to notify
    #[serde(default = "default_notifiers", alias = "ENABLED_NOTIFIERS")]
    pub enabled_notifiers: Vec<String>,

    /// Include the lunar label next to expiry dates
    #[serde(default, alias = "SHOW_LUNAR")]
    pub show_lunar: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HourEntry {
    Number(i64),
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HoursField {
    List(Vec<HourEntry>),
    Other(IgnoredAny),
}

/// Hours may be stored as numbers or strings; anything but a list means no restriction
fn lenient_hours<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match HoursField::deserialize(deserializer)? {
        HoursField::List(entries) => entries,
        HoursField::Other(_) => return Ok(Vec::new()),
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            HourEntry::Number(n) => Some(format!("{:02}", n)),
            HourEntry::Text(s) => Some(s.trim().to_string()),
            HourEntry::Other(_) => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_notifiers() -> Vec<String> {
    vec!["log".to_string()]
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            notification_hours: vec![],
            enabled_notifiers: default_notifiers(),
            show_lunar: false,
        }
    }
}

impl SchedulerSettings {
    /// Load settings from a YAML file
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: SchedulerSettings = serde_yaml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the scheduler could not act on
    pub fn validate(&self) -> Result<()> {
        CalendarClock::new(&self.timezone)?;
        NotificationHours::parse(&self.notification_hours)?;

        for name in &self.enabled_notifiers {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("Notifier names must not be empty"));
            }
        }
        Ok(())
    }

    pub fn clock(&self) -> Result<CalendarClock> {
        Ok(CalendarClock::new(&self.timezone)?)
    }

    pub fn hours(&self) -> Result<NotificationHours> {
        NotificationHours::parse(&self.notification_hours)
    }
}
