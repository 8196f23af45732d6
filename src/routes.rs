use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{self, ClassifiedSubtask, WeekBucket};
use crate::error::AppError;
use crate::models::*;
use crate::retention::{self, DateGroup};
use crate::state::AppState;

const UPCOMING_LIMIT: usize = 5;
const RECENT_WINDOW_DAYS: u32 = 7;

#[derive(Deserialize)]
struct DailyQueryParams {
    since: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct DailyViewParams {
    date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct DashboardView {
    pub total_subtasks: usize,
    pub completed: usize,
    pub missed: usize,
    pub due_today: Vec<ClassifiedSubtask>,
    pub upcoming: Vec<ClassifiedSubtask>,
    pub high_priority: Vec<ClassifiedSubtask>,
}

#[derive(Serialize)]
pub struct TimelineView {
    pub subtasks: Vec<ClassifiedSubtask>,
    pub weeks: Vec<WeekBucket>,
}

#[derive(Serialize)]
pub struct DailyBoardView {
    pub date: NaiveDate,
    pub tasks: Vec<DailyTask>,
    pub completed: usize,
    pub total: usize,
    pub recent: Vec<DateGroup>,
}

#[derive(Serialize)]
pub struct PurgeStats {
    pub purged: u64,
    pub cutoff: NaiveDate,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", patch(update_task).delete(delete_task))
        .route("/tasks/{id}/subtasks", post(create_subtask))
        .route(
            "/tasks/{id}/subtasks/{subtask_id}/toggle",
            patch(toggle_subtask),
        )
        .route("/tasks/{id}/subtasks/{subtask_id}", delete(delete_subtask))
        .route("/daily-tasks", get(list_daily_tasks).post(create_daily_task))
        .route("/daily-tasks/purge", post(purge_daily_tasks))
        .route("/daily-tasks/{id}/toggle", patch(toggle_daily_task))
        .route("/daily-tasks/{id}", delete(delete_daily_task))
        .route("/views/dashboard", get(dashboard_view))
        .route("/views/timeline", get(timeline_view))
        .route("/views/daily", get(daily_board_view))
        .with_state(state)
}

fn require_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    Ok(())
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.store.list_tasks().await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewTaskRequest>,
) -> Result<Json<Task>, AppError> {
    require_title(&req.title)?;
    let task = state.store.create_task(req).await?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    if let Some(title) = &req.title {
        require_title(title)?;
    }
    let task = state
        .store
        .update_task(&id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = state.store.delete_task(&id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn create_subtask(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(req): Json<NewSubtaskRequest>,
) -> Result<Json<Subtask>, AppError> {
    require_title(&req.title)?;
    let subtask = state
        .store
        .create_subtask(&task_id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subtask))
}

async fn toggle_subtask(
    State(state): State<AppState>,
    Path((task_id, subtask_id)): Path<(String, String)>,
) -> Result<Json<Subtask>, AppError> {
    let subtask = state
        .store
        .toggle_subtask(&task_id, &subtask_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(subtask))
}

async fn delete_subtask(
    State(state): State<AppState>,
    Path((task_id, subtask_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let ok = state.store.delete_subtask(&task_id, &subtask_id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_daily_tasks(
    State(state): State<AppState>,
    Query(params): Query<DailyQueryParams>,
) -> Result<Json<Vec<DailyTask>>, AppError> {
    let since = params
        .since
        .unwrap_or_else(|| retention::retention_floor(Utc::now().date_naive()));
    let tasks = state.store.list_daily_tasks(since).await?;
    Ok(Json(tasks))
}

async fn create_daily_task(
    State(state): State<AppState>,
    Json(req): Json<NewDailyTaskRequest>,
) -> Result<Json<DailyTask>, AppError> {
    require_title(&req.title)?;
    let task = state.store.create_daily_task(req).await?;
    Ok(Json(task))
}

async fn toggle_daily_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DailyTask>, AppError> {
    let task = state
        .store
        .toggle_daily_task(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

async fn delete_daily_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = state.store.delete_daily_task(&id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn purge_daily_tasks(State(state): State<AppState>) -> Result<Json<PurgeStats>, AppError> {
    let cutoff = retention::retention_floor(Utc::now().date_naive());
    let purged = state.store.purge_daily_tasks_before(cutoff).await?;
    Ok(Json(PurgeStats { purged, cutoff }))
}

async fn dashboard_view(State(state): State<AppState>) -> Result<Json<DashboardView>, AppError> {
    let tasks = state.store.list_tasks().await?;
    let subtasks = classify::flatten(&tasks);
    let now = Utc::now();

    Ok(Json(DashboardView {
        total_subtasks: subtasks.len(),
        completed: classify::completed_count(&subtasks),
        missed: classify::overdue(&subtasks, now).len(),
        due_today: classify::due_today(&subtasks, now),
        upcoming: classify::upcoming(&subtasks, now, UPCOMING_LIMIT),
        high_priority: classify::high_priority(&subtasks),
    }))
}

async fn timeline_view(State(state): State<AppState>) -> Result<Json<TimelineView>, AppError> {
    let tasks = state.store.list_tasks().await?;
    let subtasks = classify::flatten(&tasks);

    Ok(Json(TimelineView {
        weeks: classify::group_by_iso_week(&subtasks),
        subtasks: classify::sorted_by_deadline(&subtasks),
    }))
}

async fn daily_board_view(
    State(state): State<AppState>,
    Query(params): Query<DailyViewParams>,
) -> Result<Json<DailyBoardView>, AppError> {
    let today = Utc::now().date_naive();
    let date = params.date.unwrap_or(today);

    let daily = state
        .store
        .list_daily_tasks(retention::retention_floor(today))
        .await?;
    let tasks = retention::tasks_for_date(&daily, date);
    let completed = tasks.iter().filter(|t| t.is_completed).count();
    let total = tasks.len();

    Ok(Json(DailyBoardView {
        date,
        completed,
        total,
        tasks,
        recent: retention::group_by_recent_date(&daily, today, RECENT_WINDOW_DAYS),
    }))
}
