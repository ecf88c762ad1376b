//! Per-tick expiry evaluation.
//!
//! Pure and synchronous: takes a snapshot of records and an instant, returns
//! what is due, what was renewed and which records could not be evaluated.
//! Persisting renewals and sending notifications is left to the caller.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::hours::NotificationHours;
use super::policy::should_notify;
use crate::core::{EngineResult, ReminderError};
use crate::features::clock::CalendarClock;
use crate::features::recurrence::advance_until_future;
use crate::features::subscriptions::{ExpiryStatus, SubscriptionRecord};

/// A record selected for the notification batch
#[derive(Debug, Clone, PartialEq)]
pub struct DueSubscription {
    /// The record as it stands after any renewal this tick
    pub record: SubscriptionRecord,
    pub days_remaining: i64,
    pub hours_remaining: f64,
    pub renewed: bool,
}

impl DueSubscription {
    pub fn status(&self) -> ExpiryStatus {
        ExpiryStatus::from_days(self.days_remaining)
    }
}

/// An expiry moved forward by auto-renewal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renewal {
    pub id: String,
    pub previous_expiry: DateTime<Utc>,
    pub new_expiry: DateTime<Utc>,
    pub steps: u32,
}

/// A record skipped this tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub id: String,
    pub error: ReminderError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Sorted by `days_remaining`, empty when `gated`
    pub due: Vec<DueSubscription>,
    pub renewals: Vec<Renewal>,
    pub failures: Vec<RecordFailure>,
    /// The batch was dropped because the current hour is not a notification hour
    pub gated: bool,
}

impl TickOutcome {
    pub fn has_updates(&self) -> bool {
        !self.renewals.is_empty()
    }
}

enum Evaluation {
    Skip,
    Quiet(Option<Renewal>),
    Due(DueSubscription, Option<Renewal>),
}

/// Decides renewals and reminders for one timezone and hour filter
#[derive(Debug, Clone, Default)]
pub struct ExpiryScheduler {
    clock: CalendarClock,
    hours: NotificationHours,
}

impl ExpiryScheduler {
    pub fn new(clock: CalendarClock, hours: NotificationHours) -> Self {
        Self { clock, hours }
    }

    pub fn clock(&self) -> &CalendarClock {
        &self.clock
    }

    /// Evaluate every record once.
    ///
    /// A failure on one record is collected in `failures` and never stops the
    /// rest of the batch. Renewals are reported even when the hour gate
    /// drops the notification batch.
    pub fn evaluate(&self, records: &[SubscriptionRecord], now: DateTime<Utc>) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for record in records {
            match self.evaluate_record(record, now) {
                Ok(Evaluation::Skip) => {}
                Ok(Evaluation::Quiet(renewal)) => outcome.renewals.extend(renewal),
                Ok(Evaluation::Due(due, renewal)) => {
                    outcome.renewals.extend(renewal);
                    outcome.due.push(due);
                }
                Err(error) => {
                    warn!("Skipping subscription \"{}\" ({}): {}", record.name, record.id, error);
                    outcome.failures.push(RecordFailure {
                        id: record.id.clone(),
                        error,
                    });
                }
            }
        }

        outcome.due.sort_by_key(|d| d.days_remaining);

        if !outcome.due.is_empty() && !self.hours.allows(now) {
            info!(
                "Hour {:02} UTC is not a notification hour ({}), dropping {} reminders",
                chrono::Timelike::hour(&now),
                self.hours,
                outcome.due.len()
            );
            outcome.due.clear();
            outcome.gated = true;
        }

        outcome
    }

    fn evaluate_record(&self, record: &SubscriptionRecord, now: DateTime<Utc>) -> EngineResult<Evaluation> {
        if !record.is_active {
            debug!("Subscription \"{}\" is inactive, skipping", record.name);
            return Ok(Evaluation::Skip);
        }

        let anchor = record.anchor(&self.clock)?;
        let expiry_date = anchor.to_solar()?;
        let days_remaining = self.clock.days_until(now, expiry_date);
        let hours_remaining = CalendarClock::hours_between(now, record.expiry);

        debug!(
            "Subscription \"{}\" expires {} ({} days remaining)",
            record.name, expiry_date, days_remaining
        );

        if days_remaining < 0 {
            if !record.auto_renew {
                info!(
                    "Subscription \"{}\" expired {} days ago without auto-renew",
                    record.name, -days_remaining
                );
                return Ok(Evaluation::Due(
                    DueSubscription {
                        record: record.clone(),
                        days_remaining,
                        hours_remaining,
                        renewed: false,
                    },
                    None,
                ));
            }

            let advancement = advance_until_future(anchor, record.period, now, &self.clock)?;
            let new_expiry = self
                .clock
                .to_instant(advancement.solar, self.clock.local_time(record.expiry));
            let renewed = record.with_expiry(new_expiry);
            let renewal = Renewal {
                id: record.id.clone(),
                previous_expiry: record.expiry,
                new_expiry,
                steps: advancement.steps,
            };
            info!(
                "Renewed subscription \"{}\" from {} to {} ({} periods of {})",
                record.name,
                self.clock.format_date(record.expiry),
                advancement.solar,
                advancement.steps,
                record.period
            );

            let days_remaining = self.clock.days_until(now, advancement.solar);
            let hours_remaining = CalendarClock::hours_between(now, new_expiry);
            if should_notify(&record.reminder, days_remaining, hours_remaining) {
                return Ok(Evaluation::Due(
                    DueSubscription {
                        record: renewed,
                        days_remaining,
                        hours_remaining,
                        renewed: true,
                    },
                    Some(renewal),
                ));
            }
            return Ok(Evaluation::Quiet(Some(renewal)));
        }

        if should_notify(&record.reminder, days_remaining, hours_remaining) {
            debug!("Subscription \"{}\" is inside its reminder window", record.name);
            Ok(Evaluation::Due(
                DueSubscription {
                    record: record.clone(),
                    days_remaining,
                    hours_remaining,
                    renewed: false,
                },
                None,
            ))
        } else {
            Ok(Evaluation::Quiet(None))
        }
    }
}
