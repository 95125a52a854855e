use crate::domain::time::time_to_minutes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TaskType {
    #[default]
    Floating,
    TimeBound,
    TimeRange,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Upcoming,
    Old,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly(BTreeSet<u8>),
}

impl Recurrence {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether the schedule fires on the given weekday (0=Sunday..6=Saturday).
    pub fn applies_on(&self, weekday: u8) -> bool {
        match self {
            Self::None => false,
            Self::Daily => true,
            Self::Weekly(days) => days.contains(&weekday),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub locked: bool,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub recurrence: Recurrence,
    pub parent_task_id: Option<String>,
    pub last_daily_instance: Option<DateTime<Utc>>,
    pub moved_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;

        match self.task_type {
            TaskType::TimeBound => {
                if self.time.as_deref().and_then(time_to_minutes).is_none() {
                    return Err("task.time must be HH:MM for time-bound tasks".to_string());
                }
            }
            TaskType::TimeRange => {
                let start = self
                    .start_time
                    .as_deref()
                    .and_then(time_to_minutes)
                    .ok_or_else(|| "task.startTime must be HH:MM for time-range tasks".to_string())?;
                let end = self
                    .end_time
                    .as_deref()
                    .and_then(time_to_minutes)
                    .ok_or_else(|| "task.endTime must be HH:MM for time-range tasks".to_string())?;
                let spans_days = match (self.date, self.end_date) {
                    (Some(date), Some(end_date)) if end_date < date => {
                        return Err("task.endDate must not be before task.date".to_string());
                    }
                    (Some(date), Some(end_date)) => end_date > date,
                    _ => false,
                };
                if !spans_days && end <= start {
                    return Err(
                        "task.endTime must be after task.startTime; use endDate for overnight ranges"
                            .to_string(),
                    );
                }
            }
            TaskType::Floating | TaskType::Unknown => {}
        }

        if let Recurrence::Weekly(days) = &self.recurrence {
            if days.is_empty() {
                return Err("task.recurringDays must not be empty for weekly tasks".to_string());
            }
            if days.iter().any(|day| *day > 6) {
                return Err("task.recurringDays must use weekday indices 0-6".to_string());
            }
        }
        if self.parent_task_id.is_some() && self.recurrence.is_active() {
            return Err("task instances must not themselves recur".to_string());
        }
        Ok(())
    }
}

/// Wire shape of a task record. Matches the historical JSON layout: `type`
/// tag strings, `isDaily`/`recurringType` as redundant recurrence encodings,
/// and every temporal field as a plain string. Loading is lenient so that a
/// malformed field degrades to "no value" instead of rejecting the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub is_daily: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurring_days: Vec<u8>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_daily_instance: Option<String>,
    #[serde(default)]
    pub moved_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let recurrence = match record.recurring_type.as_deref().map(str::trim) {
            Some("daily") => Recurrence::Daily,
            Some("weekly") => Recurrence::Weekly(
                record
                    .recurring_days
                    .iter()
                    .copied()
                    .filter(|day| *day <= 6)
                    .collect(),
            ),
            _ if record.is_daily => Recurrence::Daily,
            _ => Recurrence::None,
        };

        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            task_type: record.task_type,
            date: record.date.as_deref().and_then(parse_date),
            end_date: record.end_date.as_deref().and_then(parse_date),
            time: normalize_time(record.time),
            start_time: normalize_time(record.start_time),
            end_time: normalize_time(record.end_time),
            locked: record.locked,
            completed: record.completed,
            completed_at: record.completed_at.as_deref().and_then(parse_timestamp),
            recurrence,
            parent_task_id: record.parent_task_id.filter(|id| !id.trim().is_empty()),
            last_daily_instance: record
                .last_daily_instance
                .as_deref()
                .and_then(parse_timestamp),
            moved_count: record.moved_count,
            created_at: record
                .created_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_default(),
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        let (is_daily, recurring_type, recurring_days) = match &task.recurrence {
            Recurrence::None => (false, "none", Vec::new()),
            Recurrence::Daily => (true, "daily", Vec::new()),
            Recurrence::Weekly(days) => (false, "weekly", days.iter().copied().collect()),
        };

        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            task_type: task.task_type,
            date: task.date.map(|date| date.to_string()),
            end_date: task.end_date.map(|date| date.to_string()),
            time: task.time,
            start_time: task.start_time,
            end_time: task.end_time,
            locked: task.locked,
            is_daily,
            recurring_type: Some(recurring_type.to_string()),
            recurring_days,
            completed: task.completed,
            completed_at: task.completed_at.map(|stamp| stamp.to_rfc3339()),
            parent_task_id: task.parent_task_id,
            last_daily_instance: task.last_daily_instance.map(|stamp| stamp.to_rfc3339()),
            moved_count: task.moved_count,
            created_at: Some(task.created_at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudySlot {
    pub start: String,
    pub end: String,
    pub days: Vec<u8>,
}

impl Default for StudySlot {
    fn default() -> Self {
        Self {
            start: "18:00".to_string(),
            end: "20:00".to_string(),
            days: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub wake_up_time: String,
    pub sleep_time: String,
    pub sleep_target_hours: u32,
    pub office_start_time: Option<String>,
    pub office_end_time: Option<String>,
    pub office_days: Vec<u8>,
    pub study_slots: Vec<StudySlot>,
    pub break_duration: u32,
    pub break_frequency: u32,
    pub theme: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            wake_up_time: "07:00".to_string(),
            sleep_time: "23:00".to_string(),
            sleep_target_hours: 8,
            office_start_time: None,
            office_end_time: None,
            office_days: Vec::new(),
            study_slots: Vec::new(),
            break_duration: 15,
            break_frequency: 120,
            theme: "dark".to_string(),
        }
    }
}

impl Preferences {
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.wake_up_time, "preferences.wakeUpTime")?;
        validate_hhmm(&self.sleep_time, "preferences.sleepTime")?;
        match (&self.office_start_time, &self.office_end_time) {
            (Some(start), Some(end)) => {
                validate_hhmm(start, "preferences.officeStartTime")?;
                validate_hhmm(end, "preferences.officeEndTime")?;
            }
            (None, None) => {}
            _ => {
                return Err(
                    "preferences.officeStartTime and officeEndTime must be set together"
                        .to_string(),
                );
            }
        }
        validate_weekdays(&self.office_days, "preferences.officeDays")?;
        for slot in &self.study_slots {
            validate_hhmm(&slot.start, "preferences.studySlots[].start")?;
            validate_hhmm(&slot.end, "preferences.studySlots[].end")?;
            validate_weekdays(&slot.days, "preferences.studySlots[].days")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub backup_location: Option<String>,
    pub last_backup: Option<DateTime<Utc>>,
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|stamp| stamp.with_timezone(&Utc))
}

pub fn normalize_time(value: Option<String>) -> Option<String> {
    value.filter(|time| !time.trim().is_empty())
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    if time_to_minutes(value).is_none() {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

fn validate_weekdays(days: &[u8], field_name: &str) -> Result<(), String> {
    if days.iter().any(|day| *day > 6) {
        return Err(format!("{field_name} must use weekday indices 0-6"));
    }
    Ok(())
}

// Historic records carry numeric ids; everything written since uses strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(id) => id,
        serde_json::Value::Number(id) => id.to_string(),
        _ => String::new(),
    })
}
