use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::models::{parse_date, normalize_time, Preferences, Recurrence, Settings, Task, TaskType};
use crate::domain::schedule::{
    auto_move, categorize, find_conflicts, materialize_instance, resolve_active_slots,
    should_create_instance, ActiveSlot, Categorized,
};
use crate::infrastructure::backup::{encode_backup, merge_backup};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::record_store::{self, SqliteRecordStore};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Grace period before a completion is committed, leaving room for undo.
const UNDO_GRACE_MS: u64 = 5_000;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub struct AppState {
    database_path: PathBuf,
    logs_dir: PathBuf,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let logs_dir = workspace_root.join("logs");

        Ok(Self {
            database_path: bootstrap.database_path,
            logs_dir,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        })
    }

    fn record_store(&self) -> SqliteRecordStore {
        SqliteRecordStore::new(&self.database_path)
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    loaded: bool,
    tasks: Vec<Task>,
    preferences: Preferences,
    settings: Settings,
    pending_completions: HashMap<String, u64>,
    completion_generation: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub date: Option<String>,
    pub end_date: Option<String>,
    pub time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub locked: bool,
    pub is_daily: bool,
    pub recurring_type: Option<String>,
    pub recurring_days: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoMoveResponse {
    pub moved: Vec<Task>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportBackupResponse {
    pub added_tasks: usize,
    pub preferences_restored: bool,
    pub settings_restored: bool,
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidInput(format!("runtime lock poisoned: {error}")))
}

/// Hydrates the in-memory collections from the record store once per
/// process. The lock is never held across the store reads.
async fn ensure_loaded(state: &AppState) -> Result<(), InfraError> {
    {
        let runtime = lock_runtime(state)?;
        if runtime.loaded {
            return Ok(());
        }
    }

    let store = state.record_store();
    let tasks = record_store::load_tasks(&store).await?;
    let preferences = record_store::load_preferences(&store).await?;
    let settings = record_store::load_settings(&store).await?;

    let mut runtime = lock_runtime(state)?;
    if !runtime.loaded {
        runtime.tasks = tasks;
        runtime.preferences = preferences;
        runtime.settings = settings;
        runtime.loaded = true;
    }
    Ok(())
}

async fn persist_tasks(state: &AppState, tasks: Vec<Task>) -> Result<(), InfraError> {
    let store = state.record_store();
    record_store::save_tasks(&store, &tasks).await?;
    let mut runtime = lock_runtime(state)?;
    runtime.tasks = tasks;
    Ok(())
}

async fn persist_preferences(state: &AppState, preferences: Preferences) -> Result<(), InfraError> {
    let store = state.record_store();
    record_store::save_preferences(&store, &preferences).await?;
    let mut runtime = lock_runtime(state)?;
    runtime.preferences = preferences;
    Ok(())
}

async fn persist_settings(state: &AppState, settings: Settings) -> Result<(), InfraError> {
    let store = state.record_store();
    record_store::save_settings(&store, &settings).await?;
    let mut runtime = lock_runtime(state)?;
    runtime.settings = settings;
    Ok(())
}

fn recurrence_from_draft(draft: &TaskDraft) -> Recurrence {
    match draft.recurring_type.as_deref().map(str::trim) {
        Some("daily") => Recurrence::Daily,
        Some("weekly") => Recurrence::Weekly(
            draft
                .recurring_days
                .iter()
                .copied()
                .filter(|day| *day <= 6)
                .collect::<BTreeSet<u8>>(),
        ),
        _ if draft.is_daily => Recurrence::Daily,
        _ => Recurrence::None,
    }
}

fn task_from_draft(draft: &TaskDraft, id: String) -> Task {
    let now = Utc::now();
    let recurrence = recurrence_from_draft(draft);
    let last_daily_instance = if recurrence.is_active() {
        // Freshly created parents wait until the next day before spawning.
        Some(now)
    } else {
        None
    };

    Task {
        id,
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        task_type: draft.task_type,
        date: draft
            .date
            .as_deref()
            .and_then(parse_date)
            .or_else(|| Some(Local::now().date_naive())),
        end_date: draft.end_date.as_deref().and_then(parse_date),
        time: normalize_time(draft.time.clone()),
        start_time: normalize_time(draft.start_time.clone()),
        end_time: normalize_time(draft.end_time.clone()),
        locked: draft.locked,
        completed: false,
        completed_at: None,
        recurrence,
        parent_task_id: None,
        last_daily_instance,
        moved_count: 0,
        created_at: now,
    }
}

fn visible_tasks(tasks: &[Task]) -> Vec<Task> {
    // Recurring parents are scheduling metadata; only their instances are
    // live tasks.
    tasks
        .iter()
        .filter(|task| !task.recurrence.is_active() || task.parent_task_id.is_some())
        .cloned()
        .collect()
}

pub async fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    ensure_loaded(state).await?;
    let runtime = lock_runtime(state)?;
    Ok(runtime.tasks.clone())
}

pub async fn create_task_impl(state: &AppState, draft: TaskDraft) -> Result<Task, InfraError> {
    ensure_loaded(state).await?;

    let task = task_from_draft(&draft, next_id("task"));
    task.validate().map_err(InfraError::InvalidInput)?;

    let mut tasks = {
        let runtime = lock_runtime(state)?;
        runtime.tasks.clone()
    };
    tasks.push(task.clone());
    persist_tasks(state, tasks).await?;

    state.log_info("create_task", &format!("created task_id={}", task.id));
    Ok(task)
}

pub async fn update_task_impl(
    state: &AppState,
    task_id: String,
    draft: TaskDraft,
) -> Result<Task, InfraError> {
    ensure_loaded(state).await?;
    let task_id = task_id.trim().to_string();
    if task_id.is_empty() {
        return Err(InfraError::InvalidInput(
            "task_id must not be empty".to_string(),
        ));
    }

    let mut tasks = {
        let runtime = lock_runtime(state)?;
        runtime.tasks.clone()
    };
    let Some(task) = tasks.iter_mut().find(|task| task.id == task_id) else {
        return Err(InfraError::InvalidInput(format!(
            "task not found: {task_id}"
        )));
    };

    task.title = draft.title.trim().to_string();
    task.description = draft.description.trim().to_string();
    task.task_type = draft.task_type;
    task.date = draft.date.as_deref().and_then(parse_date).or(task.date);
    task.end_date = draft.end_date.as_deref().and_then(parse_date);
    task.time = normalize_time(draft.time.clone());
    task.start_time = normalize_time(draft.start_time.clone());
    task.end_time = normalize_time(draft.end_time.clone());
    task.locked = draft.locked;
    task.recurrence = recurrence_from_draft(&draft);
    task.validate().map_err(InfraError::InvalidInput)?;

    let updated = task.clone();
    persist_tasks(state, tasks).await?;

    state.log_info("update_task", &format!("updated task_id={task_id}"));
    Ok(updated)
}

pub async fn delete_task_impl(state: &AppState, task_id: String) -> Result<bool, InfraError> {
    ensure_loaded(state).await?;
    let task_id = task_id.trim().to_string();
    if task_id.is_empty() {
        return Err(InfraError::InvalidInput(
            "task_id must not be empty".to_string(),
        ));
    }

    let mut tasks = {
        let mut runtime = lock_runtime(state)?;
        runtime.pending_completions.remove(&task_id);
        runtime.tasks.clone()
    };
    let before = tasks.len();
    tasks.retain(|task| task.id != task_id);
    if tasks.len() == before {
        return Ok(false);
    }
    persist_tasks(state, tasks).await?;

    state.log_info("delete_task", &format!("deleted task_id={task_id}"));
    Ok(true)
}

/// Completes a task after an undo grace period. Returns false when the
/// pending completion was cancelled or superseded before the delay elapsed;
/// in that case no write happens at all.
pub async fn complete_task_impl(
    state: &AppState,
    task_id: String,
    undo_delay_ms: Option<u64>,
) -> Result<bool, InfraError> {
    ensure_loaded(state).await?;
    let task_id = task_id.trim().to_string();
    if task_id.is_empty() {
        return Err(InfraError::InvalidInput(
            "task_id must not be empty".to_string(),
        ));
    }

    let generation = {
        let mut runtime = lock_runtime(state)?;
        if !runtime.tasks.iter().any(|task| task.id == task_id) {
            return Err(InfraError::InvalidInput(format!(
                "task not found: {task_id}"
            )));
        }
        runtime.completion_generation += 1;
        let generation = runtime.completion_generation;
        runtime
            .pending_completions
            .insert(task_id.clone(), generation);
        generation
    };

    let delay_ms = undo_delay_ms.unwrap_or(UNDO_GRACE_MS);
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let mut tasks = {
        let mut runtime = lock_runtime(state)?;
        if runtime.pending_completions.get(&task_id) != Some(&generation) {
            return Ok(false);
        }
        runtime.pending_completions.remove(&task_id);
        runtime.tasks.clone()
    };

    let completed_at = Utc::now();
    for task in tasks.iter_mut() {
        if task.id == task_id {
            task.completed = true;
            task.completed_at = Some(completed_at);
        }
    }
    persist_tasks(state, tasks).await?;

    state.log_info("complete_task", &format!("completed task_id={task_id}"));
    Ok(true)
}

pub async fn cancel_completion_impl(state: &AppState, task_id: String) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    Ok(runtime
        .pending_completions
        .remove(task_id.trim())
        .is_some())
}

pub async fn toggle_task_lock_impl(state: &AppState, task_id: String) -> Result<Task, InfraError> {
    ensure_loaded(state).await?;
    let task_id = task_id.trim().to_string();

    let mut tasks = {
        let runtime = lock_runtime(state)?;
        runtime.tasks.clone()
    };
    let Some(task) = tasks.iter_mut().find(|task| task.id == task_id) else {
        return Err(InfraError::InvalidInput(format!(
            "task not found: {task_id}"
        )));
    };
    task.locked = !task.locked;
    let updated = task.clone();
    persist_tasks(state, tasks).await?;

    state.log_info(
        "toggle_task_lock",
        &format!("task_id={task_id} locked={}", updated.locked),
    );
    Ok(updated)
}

/// Walks every recurring parent once, spawning the instances that are due
/// today. The instance write and the parent stamp are two separate store
/// calls; a crash between them can produce a duplicate instance on the next
/// evaluation.
pub async fn evaluate_recurrence_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    ensure_loaded(state).await?;

    let mut tasks = {
        let runtime = lock_runtime(state)?;
        runtime.tasks.clone()
    };
    let today = Local::now().date_naive();
    let due_parents: Vec<String> = tasks
        .iter()
        .filter(|task| should_create_instance(task, today))
        .map(|task| task.id.clone())
        .collect();
    if due_parents.is_empty() {
        return Ok(Vec::new());
    }

    let store = state.record_store();
    let mut created = Vec::new();
    for parent_id in due_parents {
        let Some(parent) = tasks.iter().find(|task| task.id == parent_id).cloned() else {
            continue;
        };
        let instance = materialize_instance(&parent, today, next_id("task"), Utc::now());
        tasks.push(instance.clone());
        record_store::save_tasks(&store, &tasks).await?;

        if let Some(parent) = tasks.iter_mut().find(|task| task.id == parent_id) {
            parent.last_daily_instance = Some(Utc::now());
        }
        record_store::save_tasks(&store, &tasks).await?;
        created.push(instance);
    }

    {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks = tasks;
    }
    state.log_info(
        "evaluate_recurrence",
        &format!("created {} recurring instance(s)", created.len()),
    );
    Ok(created)
}

/// Buckets the visible task list against the current clock. Recurrence is
/// evaluated first so freshly spawned instances are part of the answer.
pub async fn categorize_tasks_impl(state: &AppState) -> Result<Categorized, InfraError> {
    evaluate_recurrence_impl(state).await?;

    let visible = {
        let runtime = lock_runtime(state)?;
        visible_tasks(&runtime.tasks)
    };
    Ok(categorize(&visible, Local::now().naive_local()))
}

pub async fn detect_conflicts_impl(
    state: &AppState,
    candidate: TaskDraft,
    exclude_id: Option<String>,
) -> Result<Vec<Task>, InfraError> {
    ensure_loaded(state).await?;
    let candidate = task_from_draft(&candidate, String::new());
    let runtime = lock_runtime(state)?;
    Ok(find_conflicts(
        &candidate,
        &runtime.tasks,
        exclude_id.as_deref(),
    ))
}

/// Moves every stale, unlocked task in the old bucket to tomorrow. When
/// nothing is eligible the store is left untouched.
pub async fn auto_move_old_impl(state: &AppState) -> Result<AutoMoveResponse, InfraError> {
    ensure_loaded(state).await?;

    let now = Local::now().naive_local();
    let today = now.date();
    let mut tasks = {
        let runtime = lock_runtime(state)?;
        runtime.tasks.clone()
    };

    let old_bucket = categorize(&visible_tasks(&tasks), now).old;
    let eligible: HashSet<String> = old_bucket
        .iter()
        .filter(|task| !task.locked && !task.completed)
        .map(|task| task.id.clone())
        .collect();
    if eligible.is_empty() {
        return Ok(AutoMoveResponse {
            moved: Vec::new(),
            count: 0,
        });
    }

    for task in tasks.iter_mut() {
        if eligible.contains(&task.id) {
            *task = auto_move(task, today);
        }
    }
    let moved: Vec<Task> = tasks
        .iter()
        .filter(|task| eligible.contains(&task.id))
        .cloned()
        .collect();
    persist_tasks(state, tasks).await?;

    state.log_info(
        "auto_move_old_tasks",
        &format!("moved {} task(s) to tomorrow", moved.len()),
    );
    Ok(AutoMoveResponse {
        count: moved.len(),
        moved,
    })
}

pub async fn active_slots_impl(state: &AppState) -> Result<Vec<ActiveSlot>, InfraError> {
    ensure_loaded(state).await?;
    let runtime = lock_runtime(state)?;
    Ok(resolve_active_slots(
        &runtime.preferences,
        Local::now().naive_local(),
    ))
}

pub async fn get_preferences_impl(state: &AppState) -> Result<Preferences, InfraError> {
    ensure_loaded(state).await?;
    let runtime = lock_runtime(state)?;
    Ok(runtime.preferences.clone())
}

pub async fn save_preferences_impl(
    state: &AppState,
    preferences: Preferences,
) -> Result<Preferences, InfraError> {
    ensure_loaded(state).await?;
    preferences.validate().map_err(InfraError::InvalidInput)?;
    persist_preferences(state, preferences.clone()).await?;
    state.log_info("save_preferences", "preferences replaced");
    Ok(preferences)
}

pub async fn get_settings_impl(state: &AppState) -> Result<Settings, InfraError> {
    ensure_loaded(state).await?;
    let runtime = lock_runtime(state)?;
    Ok(runtime.settings.clone())
}

pub async fn save_settings_impl(
    state: &AppState,
    settings: Settings,
) -> Result<Settings, InfraError> {
    ensure_loaded(state).await?;
    persist_settings(state, settings.clone()).await?;
    state.log_info("save_settings", "settings replaced");
    Ok(settings)
}

/// Serializes all records into the backup payload and stamps the last-backup
/// time.
pub async fn export_backup_impl(state: &AppState) -> Result<String, InfraError> {
    ensure_loaded(state).await?;

    let (tasks, preferences, mut settings) = {
        let runtime = lock_runtime(state)?;
        (
            runtime.tasks.clone(),
            runtime.preferences.clone(),
            runtime.settings.clone(),
        )
    };
    let payload = encode_backup(&tasks, &preferences, &settings, Utc::now())?;

    settings.last_backup = Some(Utc::now());
    persist_settings(state, settings).await?;

    state.log_info(
        "export_backup",
        &format!("exported {} task(s)", tasks.len()),
    );
    Ok(payload)
}

pub async fn import_backup_impl(
    state: &AppState,
    raw: String,
) -> Result<ImportBackupResponse, InfraError> {
    ensure_loaded(state).await?;

    let (existing_tasks, current_settings) = {
        let runtime = lock_runtime(state)?;
        (runtime.tasks.clone(), runtime.settings.clone())
    };
    let outcome = merge_backup(&raw, &existing_tasks, &current_settings)?;

    if outcome.added_tasks > 0 {
        persist_tasks(state, outcome.tasks).await?;
    }
    let preferences_restored = outcome.preferences.is_some();
    if let Some(preferences) = outcome.preferences {
        persist_preferences(state, preferences).await?;
    }
    let settings_restored = outcome.settings.is_some();
    if let Some(settings) = outcome.settings {
        persist_settings(state, settings).await?;
    }

    state.log_info(
        "import_backup",
        &format!("merged backup, {} new task(s)", outcome.added_tasks),
    );
    Ok(ImportBackupResponse {
        added_tasks: outcome.added_tasks,
        preferences_restored,
        settings_restored,
    })
}
