mod application;
mod domain;
mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    active_slots_impl, auto_move_old_impl, cancel_completion_impl, categorize_tasks_impl,
    complete_task_impl, create_task_impl, delete_task_impl, detect_conflicts_impl,
    evaluate_recurrence_impl, export_backup_impl, get_preferences_impl, get_settings_impl,
    import_backup_impl, list_tasks_impl, save_preferences_impl, save_settings_impl,
    toggle_task_lock_impl, update_task_impl, AppState, AutoMoveResponse, ImportBackupResponse,
    TaskDraft,
};
use domain::models::{Preferences, Settings, Task};
use domain::schedule::{ActiveSlot, Categorized};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct BootstrapResponse {
    workspace_root: String,
    database_path: String,
}

#[tauri::command]
fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

#[tauri::command]
fn ping() -> &'static str {
    "pong"
}

#[tauri::command]
async fn list_tasks(state: tauri::State<'_, AppState>) -> Result<Vec<Task>, String> {
    list_tasks_impl(state.inner())
        .await
        .map_err(|error| state.command_error("list_tasks", &error))
}

#[tauri::command]
async fn create_task(state: tauri::State<'_, AppState>, draft: TaskDraft) -> Result<Task, String> {
    create_task_impl(state.inner(), draft)
        .await
        .map_err(|error| state.command_error("create_task", &error))
}

#[tauri::command]
async fn update_task(
    state: tauri::State<'_, AppState>,
    task_id: String,
    draft: TaskDraft,
) -> Result<Task, String> {
    update_task_impl(state.inner(), task_id, draft)
        .await
        .map_err(|error| state.command_error("update_task", &error))
}

#[tauri::command]
async fn delete_task(state: tauri::State<'_, AppState>, task_id: String) -> Result<bool, String> {
    delete_task_impl(state.inner(), task_id)
        .await
        .map_err(|error| state.command_error("delete_task", &error))
}

#[tauri::command]
async fn complete_task(
    state: tauri::State<'_, AppState>,
    task_id: String,
    undo_delay_ms: Option<u64>,
) -> Result<bool, String> {
    complete_task_impl(state.inner(), task_id, undo_delay_ms)
        .await
        .map_err(|error| state.command_error("complete_task", &error))
}

#[tauri::command]
async fn cancel_completion(
    state: tauri::State<'_, AppState>,
    task_id: String,
) -> Result<bool, String> {
    cancel_completion_impl(state.inner(), task_id)
        .await
        .map_err(|error| state.command_error("cancel_completion", &error))
}

#[tauri::command]
async fn toggle_task_lock(
    state: tauri::State<'_, AppState>,
    task_id: String,
) -> Result<Task, String> {
    toggle_task_lock_impl(state.inner(), task_id)
        .await
        .map_err(|error| state.command_error("toggle_task_lock", &error))
}

#[tauri::command]
async fn categorize_tasks(state: tauri::State<'_, AppState>) -> Result<Categorized, String> {
    categorize_tasks_impl(state.inner())
        .await
        .map_err(|error| state.command_error("categorize_tasks", &error))
}

#[tauri::command]
async fn evaluate_recurrence(state: tauri::State<'_, AppState>) -> Result<Vec<Task>, String> {
    evaluate_recurrence_impl(state.inner())
        .await
        .map_err(|error| state.command_error("evaluate_recurrence", &error))
}

#[tauri::command]
async fn detect_conflicts(
    state: tauri::State<'_, AppState>,
    candidate: TaskDraft,
    exclude_id: Option<String>,
) -> Result<Vec<Task>, String> {
    detect_conflicts_impl(state.inner(), candidate, exclude_id)
        .await
        .map_err(|error| state.command_error("detect_conflicts", &error))
}

#[tauri::command]
async fn auto_move_old_tasks(
    state: tauri::State<'_, AppState>,
) -> Result<AutoMoveResponse, String> {
    auto_move_old_impl(state.inner())
        .await
        .map_err(|error| state.command_error("auto_move_old_tasks", &error))
}

#[tauri::command]
async fn active_slots(state: tauri::State<'_, AppState>) -> Result<Vec<ActiveSlot>, String> {
    active_slots_impl(state.inner())
        .await
        .map_err(|error| state.command_error("active_slots", &error))
}

#[tauri::command]
async fn get_preferences(state: tauri::State<'_, AppState>) -> Result<Preferences, String> {
    get_preferences_impl(state.inner())
        .await
        .map_err(|error| state.command_error("get_preferences", &error))
}

#[tauri::command]
async fn save_preferences(
    state: tauri::State<'_, AppState>,
    preferences: Preferences,
) -> Result<Preferences, String> {
    save_preferences_impl(state.inner(), preferences)
        .await
        .map_err(|error| state.command_error("save_preferences", &error))
}

#[tauri::command]
async fn get_settings(state: tauri::State<'_, AppState>) -> Result<Settings, String> {
    get_settings_impl(state.inner())
        .await
        .map_err(|error| state.command_error("get_settings", &error))
}

#[tauri::command]
async fn save_settings(
    state: tauri::State<'_, AppState>,
    settings: Settings,
) -> Result<Settings, String> {
    save_settings_impl(state.inner(), settings)
        .await
        .map_err(|error| state.command_error("save_settings", &error))
}

#[tauri::command]
async fn export_backup(state: tauri::State<'_, AppState>) -> Result<String, String> {
    export_backup_impl(state.inner())
        .await
        .map_err(|error| state.command_error("export_backup", &error))
}

#[tauri::command]
async fn import_backup(
    state: tauri::State<'_, AppState>,
    payload: String,
) -> Result<ImportBackupResponse, String> {
    import_backup_impl(state.inner(), payload)
        .await
        .map_err(|error| state.command_error("import_backup", &error))
}

pub fn run() {
    let workspace_root = std::env::current_dir().expect("failed to resolve current directory");
    let app_state = AppState::new(workspace_root).expect("failed to initialize app state");

    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            ping,
            bootstrap,
            list_tasks,
            create_task,
            update_task,
            delete_task,
            complete_task,
            cancel_completion,
            toggle_task_lock,
            categorize_tasks,
            evaluate_recurrence,
            detect_conflicts,
            auto_move_old_tasks,
            active_slots,
            get_preferences,
            save_preferences,
            get_settings,
            save_settings,
            export_backup,
            import_backup
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}
