pub mod repository;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{
    DailyTask, NewDailyTaskRequest, NewSubtaskRequest, NewTaskRequest, Subtask, Task,
    UpdateTaskRequest,
};

pub use repository::SqliteStore;

/// Persistence contract consumed by the HTTP handlers and the retention
/// sweeper. A failed call leaves stored state untouched; callers re-read
/// instead of patching in-memory copies.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, AppError>;
    async fn create_task(&self, req: NewTaskRequest) -> Result<Task, AppError>;
    async fn update_task(
        &self,
        id: &str,
        req: UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError>;
    async fn delete_task(&self, id: &str) -> Result<bool, AppError>;

    async fn create_subtask(
        &self,
        task_id: &str,
        req: NewSubtaskRequest,
    ) -> Result<Option<Subtask>, AppError>;
    async fn toggle_subtask(
        &self,
        task_id: &str,
        subtask_id: &str,
    ) -> Result<Option<Subtask>, AppError>;
    async fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> Result<bool, AppError>;

    async fn list_daily_tasks(&self, since: NaiveDate) -> Result<Vec<DailyTask>, AppError>;
    async fn create_daily_task(&self, req: NewDailyTaskRequest) -> Result<DailyTask, AppError>;
    async fn toggle_daily_task(&self, id: &str) -> Result<Option<DailyTask>, AppError>;
    async fn delete_daily_task(&self, id: &str) -> Result<bool, AppError>;
    async fn purge_daily_tasks_before(&self, cutoff: NaiveDate) -> Result<u64, AppError>;
}
