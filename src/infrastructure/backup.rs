use crate::domain::models::{Preferences, Settings, Task};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub settings: Option<Settings>,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

pub fn encode_backup(
    tasks: &[Task],
    preferences: &Preferences,
    settings: &Settings,
    export_date: DateTime<Utc>,
) -> Result<String, InfraError> {
    let payload = BackupPayload {
        tasks: tasks.to_vec(),
        preferences: Some(preferences.clone()),
        settings: Some(settings.clone()),
        export_date,
        version: BACKUP_VERSION.to_string(),
    };
    let formatted = serde_json::to_string_pretty(&payload)?;
    Ok(format!("{formatted}\n"))
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub tasks: Vec<Task>,
    pub added_tasks: usize,
    pub preferences: Option<Preferences>,
    pub settings: Option<Settings>,
}

/// Merges a backup into the current data. Existing tasks win: only backup
/// tasks with unseen ids are appended. Preferences are restored wholesale;
/// settings keep the currently configured backup location.
pub fn merge_backup(
    raw: &str,
    existing_tasks: &[Task],
    current_settings: &Settings,
) -> Result<MergeOutcome, InfraError> {
    let payload: BackupPayload = serde_json::from_str(raw)?;

    let known_ids: HashSet<&str> = existing_tasks.iter().map(|task| task.id.as_str()).collect();
    let mut tasks = existing_tasks.to_vec();
    let mut added_tasks = 0;
    for task in payload.tasks {
        if known_ids.contains(task.id.as_str()) {
            continue;
        }
        tasks.push(task);
        added_tasks += 1;
    }

    let settings = payload.settings.map(|restored| Settings {
        backup_location: current_settings
            .backup_location
            .clone()
            .or(restored.backup_location),
        last_backup: restored.last_backup,
    });

    Ok(MergeOutcome {
        tasks,
        added_tasks,
        preferences: payload.preferences,
        settings,
    })
}
