use crate::domain::models::{Preferences, Settings, Task};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TASKS_KEY: &str = "allTasks";
pub const PREFERENCES_KEY: &str = "userPreferences";
pub const SETTINGS_KEY: &str = "appSettings";

/// Opaque key-value persistence collaborator. Collections are replaced
/// wholesale under a fixed key; readers get the latest committed value.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    db_path: PathBuf,
}

impl SqliteRecordStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value: Option<String> = connection
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO records (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let records = self
            .records
            .lock()
            .map_err(|error| InfraError::InvalidInput(format!("record lock poisoned: {error}")))?;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut records = self
            .records
            .lock()
            .map_err(|error| InfraError::InvalidInput(format!("record lock poisoned: {error}")))?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub async fn load_tasks(store: &dyn RecordStore) -> Result<Vec<Task>, InfraError> {
    match store.get(TASKS_KEY).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

pub async fn save_tasks(store: &dyn RecordStore, tasks: &[Task]) -> Result<(), InfraError> {
    store.put(TASKS_KEY, &serde_json::to_string(tasks)?).await
}

/// Missing preference records fall back to the defaults.
pub async fn load_preferences(store: &dyn RecordStore) -> Result<Preferences, InfraError> {
    match store.get(PREFERENCES_KEY).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Preferences::default()),
    }
}

pub async fn save_preferences(
    store: &dyn RecordStore,
    preferences: &Preferences,
) -> Result<(), InfraError> {
    store
        .put(PREFERENCES_KEY, &serde_json::to_string(preferences)?)
        .await
}

pub async fn load_settings(store: &dyn RecordStore) -> Result<Settings, InfraError> {
    match store.get(SETTINGS_KEY).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Settings::default()),
    }
}

pub async fn save_settings(store: &dyn RecordStore, settings: &Settings) -> Result<(), InfraError> {
    store
        .put(SETTINGS_KEY, &serde_json::to_string(settings)?)
        .await
}
