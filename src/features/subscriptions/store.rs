//! Persistence seam for subscription records and scheduler settings

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use tokio::sync::RwLock;

use super::record::{SubscriptionRecord, SubscriptionUpdate};
use super::stored::StoredSubscription;
use crate::core::SchedulerSettings;
use crate::features::clock::CalendarClock;
use crate::features::reminders::Renewal;

/// Storage used by the scheduler.
///
/// Reads return a snapshot; a tick writes back once at the end. Callers
/// must not run two ticks against the same store at the same time.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Every readable record. Unreadable stored entries are logged and skipped.
    async fn load_all_records(&self) -> Result<Vec<SubscriptionRecord>>;

    /// Replace every readable record with `records`
    async fn save_all_records(&self, records: &[SubscriptionRecord]) -> Result<()>;

    /// Write renewed expiries back, returning how many records were updated
    async fn apply_renewals(&self, renewals: &[Renewal]) -> Result<usize> {
        if renewals.is_empty() {
            return Ok(0);
        }
        let mut records = self.load_all_records().await?;
        let mut applied = 0;
        for record in records.iter_mut() {
            if let Some(renewal) = renewals.iter().find(|r| r.id == record.id) {
                *record = record.with_expiry(renewal.new_expiry);
                applied += 1;
            }
        }
        self.save_all_records(&records).await?;
        Ok(applied)
    }

    async fn load_settings(&self) -> Result<Option<SchedulerSettings>>;

    async fn save_settings(&self, settings: &SchedulerSettings) -> Result<()>;

    async fn find_record(&self, id: &str) -> Result<Option<SubscriptionRecord>> {
        let records = self.load_all_records().await?;
        Ok(records.into_iter().find(|r| r.id == id))
    }

    async fn add_record(&self, record: SubscriptionRecord) -> Result<()> {
        let mut records = self.load_all_records().await?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(anyhow!("Subscription {} already exists", record.id));
        }
        records.push(record);
        self.save_all_records(&records).await
    }

    /// Validate and apply an edit, returning the updated copy.
    /// `None` when no record has `id`.
    async fn update_record(
        &self,
        id: &str,
        update: &SubscriptionUpdate,
        clock: &CalendarClock,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionRecord>> {
        let mut records = self.load_all_records().await?;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let updated = update.apply(&records[index], clock, now)?;
        records[index] = updated.clone();
        self.save_all_records(&records).await?;
        Ok(Some(updated))
    }

    /// Remove a record, returning false when no record has `id`
    async fn delete_record(&self, id: &str) -> Result<bool> {
        let mut records = self.load_all_records().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            warn!("Cannot delete subscription {}: not found", id);
            return Ok(false);
        }
        self.save_all_records(&records).await?;
        Ok(true)
    }

    /// Toggle a record's active flag, returning the updated copy
    async fn set_active(
        &self,
        id: &str,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionRecord>> {
        let mut records = self.load_all_records().await?;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let updated = records[index].with_active(is_active, now);
        records[index] = updated.clone();
        self.save_all_records(&records).await?;
        Ok(Some(updated))
    }
}

/// Migrate stored entries, logging and skipping the ones that cannot be read
pub fn migrate_records(stored: Vec<StoredSubscription>) -> Vec<SubscriptionRecord> {
    stored
        .into_iter()
        .filter_map(|entry| {
            let id = entry.id.clone();
            match SubscriptionRecord::try_from(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable subscription {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

/// Process-local store, used by tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<SubscriptionRecord>>,
    settings: RwLock<Option<SchedulerSettings>>,
}

impl MemoryStore {
    pub fn new(records: Vec<SubscriptionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            settings: RwLock::new(None),
        }
    }

    pub fn with_settings(self, settings: SchedulerSettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
            ..self
        }
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn load_all_records(&self) -> Result<Vec<SubscriptionRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn save_all_records(&self, records: &[SubscriptionRecord]) -> Result<()> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }

    async fn load_settings(&self) -> Result<Option<SchedulerSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &SchedulerSettings) -> Result<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ReminderError;
    use crate::features::recurrence::PeriodUnit;
    use crate::features::subscriptions::NewSubscription;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn record(name: &str) -> SubscriptionRecord {
        NewSubscription {
            name: name.to_string(),
            expiry_date: Some(at("2024-04-01T00:00:00Z")),
            period_unit: Some(PeriodUnit::Year),
            ..Default::default()
        }
        .into_record(&CalendarClock::utc(), at("2024-03-01T00:00:00Z"))
        .unwrap()
    }

    #[tokio::test]
    async fn test_apply_renewals_by_id() {
        let a = record("a");
        let b = record("b");
        let store = MemoryStore::new(vec![a.clone(), b.clone()]);

        let renewal = Renewal {
            id: b.id.clone(),
            previous_expiry: b.expiry,
            new_expiry: at("2025-04-01T00:00:00Z"),
            steps: 1,
        };
        assert_eq!(store.apply_renewals(&[renewal]).await.unwrap(), 1);

        let records = store.load_all_records().await.unwrap();
        assert_eq!(records[0].expiry, a.expiry);
        assert_eq!(records[1].expiry, at("2025-04-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_set_active_and_find() {
        let a = record("a");
        let store = MemoryStore::new(vec![a.clone()]);
        let updated = store
            .set_active(&a.id, false, at("2024-03-02T00:00:00Z"))
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_active);
        assert!(!store.find_record(&a.id).await.unwrap().unwrap().is_active);
        assert!(store.set_active("missing", true, at("2024-03-02T00:00:00Z")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_record() {
        let a = record("a");
        let store = MemoryStore::new(vec![a.clone(), record("b")]);
        let clock = CalendarClock::utc();
        let now = at("2024-03-05T00:00:00Z");

        let update = SubscriptionUpdate {
            name: "a renamed".to_string(),
            expiry_date: Some(at("2024-02-01T00:00:00Z")),
            ..Default::default()
        };
        let updated = store
            .update_record(&a.id, &update, &clock, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "a renamed");
        // Yearly period carried over from the stored record
        assert_eq!(updated.expiry, at("2025-02-01T00:00:00Z"));
        assert_eq!(store.find_record(&a.id).await.unwrap(), Some(updated));
        assert!(store.update_record("missing", &update, &clock, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_record_rejects_out_of_range_lunar() {
        let a = record("a");
        let store = MemoryStore::new(vec![a.clone()]);
        let update = SubscriptionUpdate {
            name: "a".to_string(),
            expiry_date: Some(at("2101-06-01T00:00:00Z")),
            use_lunar: true,
            ..Default::default()
        };
        let err = store
            .update_record(&a.id, &update, &CalendarClock::utc(), at("2024-03-05T00:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReminderError>(),
            Some(&ReminderError::LunarRange { year: 2101 })
        );
        assert_eq!(store.find_record(&a.id).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_delete_record() {
        let a = record("a");
        let b = record("b");
        let store = MemoryStore::new(vec![a.clone(), b.clone()]);
        assert!(store.delete_record(&a.id).await.unwrap());
        assert!(!store.delete_record(&a.id).await.unwrap());
        assert!(!store.delete_record("missing").await.unwrap());

        let records = store.load_all_records().await.unwrap();
        assert_eq!(records, vec![b]);
    }

    #[tokio::test]
    async fn test_add_record_rejects_duplicate_id() {
        let a = record("a");
        let store = MemoryStore::default();
        store.add_record(a.clone()).await.unwrap();
        assert!(store.add_record(a).await.is_err());
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let store = MemoryStore::default();
        assert!(store.load_settings().await.unwrap().is_none());
        let settings = SchedulerSettings {
            timezone: "Asia/Shanghai".to_string(),
            ..Default::default()
        };
        store.save_settings(&settings).await.unwrap();
        assert_eq!(store.load_settings().await.unwrap(), Some(settings));
    }

    #[test]
    fn test_migrate_skips_unreadable() {
        let stored: Vec<StoredSubscription> = serde_json::from_str(
            r#"[{"id":"1","expiryDate":"2024-01-01"},{"id":"2","expiryDate":"2024-01-01","periodValue":0}]"#,
        )
        .unwrap();
        let records = migrate_records(stored);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
    }
}
