//! Tick runner: loads settings and records, evaluates, persists renewals and
//! sends the batch.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::engine::{ExpiryScheduler, TickOutcome};
use crate::core::SchedulerSettings;
use crate::features::notifications::{
    extract_tags, format_batch, format_test, Delivery, NotifierRegistry, BATCH_TITLE,
};
use crate::features::subscriptions::SubscriptionStore;

/// Runs scheduler ticks against a store and a set of channels.
///
/// Ticks must not overlap; `run` awaits each tick before the next one.
pub struct ReminderScheduler {
    store: Arc<dyn SubscriptionStore>,
    notifiers: NotifierRegistry,
    fallback_settings: SchedulerSettings,
    settings_path: Option<String>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        notifiers: NotifierRegistry,
        fallback_settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            notifiers,
            fallback_settings,
            settings_path: None,
        }
    }

    /// Read settings from this YAML file when the store has none
    pub fn with_settings_file(mut self, path: impl Into<String>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Settings for this tick: the store's, else the settings file, else the fallback
    pub async fn resolve_settings(&self) -> SchedulerSettings {
        match self.store.load_settings().await {
            Ok(Some(settings)) => match settings.validate() {
                Ok(()) => return settings,
                Err(e) => warn!("Ignoring invalid stored settings: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to load stored settings: {}", e),
        }

        if let Some(path) = &self.settings_path {
            if Path::new(path).exists() {
                match SchedulerSettings::load(path) {
                    Ok(settings) => return settings,
                    Err(e) => warn!("Ignoring settings file {}: {}", path, e),
                }
            }
        }

        self.fallback_settings.clone()
    }

    /// One pass over every record
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let settings = self.resolve_settings().await;
        let clock = settings.clock()?;
        let engine = ExpiryScheduler::new(clock, settings.hours()?);

        info!(
            "[tick] Checking subscriptions at {} UTC ({} in {})",
            now.format("%Y-%m-%d %H:%M:%S"),
            clock.format_datetime(now),
            clock.name()
        );

        let records = self.store.load_all_records().await?;
        info!("[tick] Found {} subscriptions", records.len());

        let outcome = engine.evaluate(&records, now);

        if outcome.has_updates() {
            let applied = self.store.apply_renewals(&outcome.renewals).await?;
            info!("[tick] Saved {} renewed expiry dates", applied);
        }

        if !outcome.failures.is_empty() {
            warn!(
                "[tick] {} subscriptions could not be evaluated",
                outcome.failures.len()
            );
        }

        if !outcome.due.is_empty() {
            let body = format_batch(&outcome.due, &settings, &clock, now);
            let tags = extract_tags(outcome.due.iter().map(|d| &d.record));
            let deliveries = self
                .notifiers
                .dispatch(&settings.enabled_notifiers, BATCH_TITLE, &body, &tags, "[tick]")
                .await;
            info!(
                "[tick] Sent {} reminders to {} channels",
                outcome.due.len(),
                deliveries.iter().filter(|d| d.success).count()
            );
        }

        Ok(outcome)
    }

    /// Tick forever, logging errors and carrying on
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        info!(
            "Reminder scheduler started (interval: {}s)",
            interval.as_secs()
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_tick(Utc::now()).await {
                error!("[tick] Scheduler tick failed: {e}");
            }
        }
    }

    /// Send a manual test notification for one record, ignoring reminder
    /// windows and notification hours
    pub async fn send_test_notification(&self, id: &str, now: DateTime<Utc>) -> Result<Vec<Delivery>> {
        let record = self
            .store
            .find_record(id)
            .await?
            .ok_or_else(|| anyhow!("Subscription not found: {}", id))?;

        let settings = self.resolve_settings().await;
        let clock = settings.clock()?;
        let (title, body) = format_test(&record, &settings, &clock, now);
        let tags = extract_tags([&record]);

        Ok(self
            .notifiers
            .dispatch(&settings.enabled_notifiers, &title, &body, &tags, "[test]")
            .await)
    }
}
