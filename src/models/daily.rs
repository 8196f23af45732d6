use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Day-scoped to-do item, independent of the task/subtask hierarchy.
/// Kept for the trailing 7 calendar days, then purged.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyTask {
    pub id: String,
    pub title: String,
    pub task_date: NaiveDate,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDailyTaskRequest {
    pub title: String,
    pub task_date: NaiveDate,
}
