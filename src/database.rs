//! SQLite-backed key/value store.
//!
//! Subscriptions live as one JSON array under `subscriptions`, scheduler
//! settings as one JSON object under `config`. Renewals patch `expiryDate`
//! in place so fields this crate does not model are never lost.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use sqlite::{Connection, State};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::SchedulerSettings;
use crate::features::reminders::Renewal;
use crate::features::subscriptions::stored::format_instant;
use crate::features::subscriptions::{
    migrate_records, StoredSubscription, SubscriptionRecord, SubscriptionStore,
};

const SUBSCRIPTIONS_KEY: &str = "subscriptions";
const CONFIG_KEY: &str = "config";

/// Upper-case keys older deployments used for the scheduler settings
const LEGACY_SETTING_KEYS: [&str; 4] = [
    "TIMEZONE",
    "NOTIFICATION_HOURS",
    "ENABLED_NOTIFIERS",
    "SHOW_LUNAR",
];

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        let connection = sqlite::open(database_path)?;
        connection.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        info!("Database initialized at {}", database_path);

        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| anyhow!("Database lock poisoned: {}", e))
    }

    fn get_value(&self, key: &str) -> Result<Option<String>> {
        let connection = self.lock()?;
        let mut statement = connection.prepare("SELECT value FROM kv WHERE key = ?")?;
        statement.bind((1, key))?;
        if let State::Row = statement.next()? {
            Ok(Some(statement.read::<String, _>("value")?))
        } else {
            Ok(None)
        }
    }

    fn put_value(&self, key: &str, value: &str) -> Result<()> {
        let connection = self.lock()?;
        let mut statement =
            connection.prepare("INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)")?;
        statement.bind((1, key))?;
        statement.bind((2, value))?;
        statement.next()?;
        Ok(())
    }

    /// Raw stored subscription entries; a missing key is an empty collection
    fn read_collection(&self) -> Result<Vec<Value>> {
        match self.get_value(SUBSCRIPTIONS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_collection(&self, entries: &[Value]) -> Result<()> {
        self.put_value(SUBSCRIPTIONS_KEY, &serde_json::to_string(entries)?)
    }

    fn read_config_object(&self) -> Result<Map<String, Value>> {
        match self.get_value(CONFIG_KEY)? {
            Some(raw) => match serde_json::from_str::<Value>(&raw)? {
                Value::Object(map) => Ok(map),
                _ => Err(anyhow!("Stored config is not a JSON object")),
            },
            None => Ok(Map::new()),
        }
    }

    fn apply_renewals_sync(&self, renewals: &[Renewal]) -> Result<usize> {
        let mut entries = self.read_collection()?;
        let mut applied = 0;

        for entry in entries.iter_mut() {
            let Some(id) = entry_id(entry) else {
                continue;
            };
            let Some(renewal) = renewals.iter().find(|r| r.id == id) else {
                continue;
            };
            if let Value::Object(fields) = entry {
                fields.insert(
                    "expiryDate".to_string(),
                    Value::String(format_instant(renewal.new_expiry)),
                );
                applied += 1;
            }
        }

        if applied < renewals.len() {
            warn!(
                "{} renewed subscriptions were no longer in the store",
                renewals.len() - applied
            );
        }
        self.write_collection(&entries)?;
        Ok(applied)
    }

    fn save_all_records_sync(&self, records: &[SubscriptionRecord]) -> Result<()> {
        let mut extras: HashMap<String, Map<String, Value>> = HashMap::new();
        let mut unreadable = Vec::new();

        for entry in self.read_collection()? {
            match serde_json::from_value::<StoredSubscription>(entry.clone()) {
                Ok(stored) => {
                    let id = stored.id.clone();
                    let replaced = records.iter().any(|r| r.id == id);
                    if !replaced && SubscriptionRecord::try_from(stored.clone()).is_err() {
                        unreadable.push(entry);
                    } else {
                        extras.insert(id, stored.extra);
                    }
                }
                Err(_) => unreadable.push(entry),
            }
        }

        let mut entries = Vec::with_capacity(records.len() + unreadable.len());
        for record in records {
            let mut stored = StoredSubscription::from(record);
            if let Some(extra) = extras.remove(&record.id) {
                stored.extra = extra;
            }
            entries.push(serde_json::to_value(stored)?);
        }
        entries.extend(unreadable);

        self.write_collection(&entries)
    }
}

fn entry_id(entry: &Value) -> Option<String> {
    match entry.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    async fn load_all_records(&self) -> Result<Vec<SubscriptionRecord>> {
        let stored: Vec<StoredSubscription> = self
            .read_collection()?
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    warn!("Skipping malformed stored subscription: {}", e);
                    None
                }
            })
            .collect();
        let records = migrate_records(stored);
        debug!("Loaded {} subscriptions", records.len());
        Ok(records)
    }

    async fn save_all_records(&self, records: &[SubscriptionRecord]) -> Result<()> {
        self.save_all_records_sync(records)
    }

    async fn apply_renewals(&self, renewals: &[Renewal]) -> Result<usize> {
        if renewals.is_empty() {
            return Ok(0);
        }
        self.apply_renewals_sync(renewals)
    }

    async fn load_settings(&self) -> Result<Option<SchedulerSettings>> {
        let config = self.read_config_object()?;
        if config.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(Value::Object(config))?))
    }

    /// Merges into the stored config object, keeping unrelated keys
    async fn save_settings(&self, settings: &SchedulerSettings) -> Result<()> {
        let mut config = self.read_config_object()?;
        for key in LEGACY_SETTING_KEYS {
            config.remove(key);
        }
        if let Value::Object(fields) = serde_json::to_value(settings)? {
            config.extend(fields);
        }
        self.put_value(CONFIG_KEY, &serde_json::to_string(&config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    async fn seeded(json: &str) -> Database {
        let db = Database::new(":memory:").await.unwrap();
        db.put_value(SUBSCRIPTIONS_KEY, json).unwrap();
        db
    }

    const SEED: &str = r#"[
        {"id":"1","name":"Gym","expiryDate":"2024-01-31T00:00:00.000Z","periodValue":1,"periodUnit":"month","reminderDays":3,"color":"red"},
        {"id":"2","name":"Broken","expiryDate":"2024-01-31T00:00:00.000Z","periodValue":0,"periodUnit":"month"},
        {"id":3,"name":"Domain","expiryDate":"2024-06-01T00:00:00.000Z","periodUnit":"year","isActive":false}
    ]"#;

    #[tokio::test]
    async fn test_empty_store() {
        let db = Database::new(":memory:").await.unwrap();
        assert!(db.load_all_records().await.unwrap().is_empty());
        assert!(db.load_settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_migrates_and_skips_invalid() {
        let db = seeded(SEED).await;
        let records = db.load_all_records().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(records[0].reminder.value, 3);
        assert!(!records[1].is_active);
    }

    #[tokio::test]
    async fn test_apply_renewals_patches_in_place() {
        let db = seeded(SEED).await;
        let renewal = Renewal {
            id: "1".to_string(),
            previous_expiry: at("2024-01-31T00:00:00Z"),
            new_expiry: at("2024-03-31T00:00:00Z"),
            steps: 2,
        };
        assert_eq!(db.apply_renewals(&[renewal]).await.unwrap(), 1);

        let raw: Vec<Value> =
            serde_json::from_str(&db.get_value(SUBSCRIPTIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0]["expiryDate"], "2024-03-31T00:00:00.000Z");
        assert_eq!(raw[0]["color"], "red");
        assert_eq!(raw[0]["reminderDays"], 3);
        assert_eq!(raw[1]["periodValue"], 0);
    }

    #[tokio::test]
    async fn test_save_all_keeps_unknown_fields_and_unreadable_entries() {
        let db = seeded(SEED).await;
        let records = db.load_all_records().await.unwrap();
        let toggled: Vec<SubscriptionRecord> = records
            .iter()
            .map(|r| r.with_active(true, at("2024-03-01T00:00:00Z")))
            .collect();
        db.save_all_records(&toggled).await.unwrap();

        let raw: Vec<Value> =
            serde_json::from_str(&db.get_value(SUBSCRIPTIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0]["color"], "red");
        assert_eq!(raw[1]["isActive"], true);
        assert_eq!(raw[2]["id"], "2");

        let reloaded = db.load_all_records().await.unwrap();
        assert!(reloaded.iter().all(|r| r.is_active));
    }

    #[tokio::test]
    async fn test_update_and_delete_keep_other_entries() {
        use crate::features::clock::CalendarClock;
        use crate::features::subscriptions::SubscriptionUpdate;

        let db = seeded(SEED).await;
        let update = SubscriptionUpdate {
            name: "Gym Plus".to_string(),
            expiry_date: Some(at("2024-05-31T00:00:00Z")),
            ..Default::default()
        };
        let updated = db
            .update_record("1", &update, &CalendarClock::utc(), at("2024-03-01T00:00:00Z"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.reminder.value, 3);

        let raw: Vec<Value> =
            serde_json::from_str(&db.get_value(SUBSCRIPTIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw[0]["name"], "Gym Plus");
        assert_eq!(raw[0]["color"], "red");

        assert!(db.delete_record("3").await.unwrap());
        assert!(!db.delete_record("3").await.unwrap());
        let raw: Vec<Value> =
            serde_json::from_str(&db.get_value(SUBSCRIPTIONS_KEY).unwrap().unwrap()).unwrap();
        let ids: Vec<Option<&str>> = raw.iter().map(|e| e["id"].as_str()).collect();
        assert_eq!(ids, vec![Some("1"), Some("2")]);
    }

    #[tokio::test]
    async fn test_legacy_numeric_hours_load() {
        let db = Database::new(":memory:").await.unwrap();
        db.put_value(CONFIG_KEY, r#"{"TIMEZONE":"Asia/Shanghai","NOTIFICATION_HOURS":[8,20]}"#)
            .unwrap();
        let settings = db.load_settings().await.unwrap().unwrap();
        assert_eq!(settings.timezone, "Asia/Shanghai");
        assert_eq!(settings.notification_hours, vec!["08", "20"]);
    }

    #[tokio::test]
    async fn test_settings_merge_with_legacy_config() {
        let db = Database::new(":memory:").await.unwrap();
        db.put_value(
            CONFIG_KEY,
            r#"{"ADMIN_USERNAME":"admin","TIMEZONE":"Asia/Shanghai","NOTIFICATION_HOURS":["08"],"SHOW_LUNAR":true}"#,
        )
        .unwrap();

        let settings = db.load_settings().await.unwrap().unwrap();
        assert_eq!(settings.timezone, "Asia/Shanghai");
        assert_eq!(settings.notification_hours, vec!["08"]);
        assert!(settings.show_lunar);

        let updated = SchedulerSettings {
            timezone: "Europe/Berlin".to_string(),
            ..settings
        };
        db.save_settings(&updated).await.unwrap();
        assert_eq!(db.load_settings().await.unwrap(), Some(updated));

        let raw: Value =
            serde_json::from_str(&db.get_value(CONFIG_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["ADMIN_USERNAME"], "admin");
        assert!(raw.get("TIMEZONE").is_none());
    }
}
