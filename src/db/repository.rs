use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::TaskStore;
use crate::error::AppError;
use crate::models::{
    DailyTask, NewDailyTaskRequest, NewSubtaskRequest, NewTaskRequest, Subtask, Task, TaskStatus,
    UpdateTaskRequest,
};

/// SQLite-backed store. Subtask rows live in their own table and are joined
/// into their parent tasks on read; deleting a task cascades to them.
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT id, title, description, deadline, priority, status, created_at FROM tasks WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }

    async fn find_subtask(
        &self,
        task_id: &str,
        subtask_id: &str,
    ) -> Result<Option<Subtask>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            "SELECT id, task_id, title, deadline, is_completed, created_at FROM subtasks WHERE id = ? AND task_id = ?"
        )
        .bind(subtask_id)
        .bind(task_id)
        .fetch_optional(&self.db)
        .await
    }

    async fn find_daily_task(&self, id: &str) -> Result<Option<DailyTask>, sqlx::Error> {
        sqlx::query_as::<_, DailyTask>(
            "SELECT id, title, task_date, is_completed, completed_at, created_at FROM daily_tasks WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let mut tasks = sqlx::query_as::<_, Task>(
            "SELECT id, title, description, deadline, priority, status, created_at FROM tasks ORDER BY created_at ASC"
        )
        .fetch_all(&self.db)
        .await?;

        let subtasks = sqlx::query_as::<_, Subtask>(
            "SELECT id, task_id, title, deadline, is_completed, created_at FROM subtasks ORDER BY created_at ASC"
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_task: HashMap<String, Vec<Subtask>> = HashMap::new();
        for subtask in subtasks {
            by_task
                .entry(subtask.task_id.clone())
                .or_default()
                .push(subtask);
        }
        for task in &mut tasks {
            if let Some(children) = by_task.remove(&task.id) {
                task.subtasks = children;
            }
        }

        Ok(tasks)
    }

    async fn create_task(&self, req: NewTaskRequest) -> Result<Task, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO tasks (id, title, description, deadline, priority, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.deadline)
        .bind(req.priority)
        .bind(TaskStatus::Pending)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Task {
            id,
            title: req.title,
            description: req.description,
            deadline: req.deadline,
            priority: req.priority,
            status: TaskStatus::Pending,
            created_at: now,
            subtasks: Vec::new(),
        })
    }

    async fn update_task(
        &self,
        id: &str,
        req: UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError> {
        let mut current = match self.find_task(id).await? {
            Some(t) => t,
            None => return Ok(None),
        };

        if let Some(title) = req.title {
            current.title = title;
        }
        if let Some(description) = req.description {
            current.description = Some(description);
        }
        if let Some(deadline) = req.deadline {
            current.deadline = Some(deadline);
        }
        if let Some(priority) = req.priority {
            current.priority = priority;
        }
        if let Some(status) = req.status {
            current.status = status;
        }

        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, deadline = ?, priority = ?, status = ? WHERE id = ?"
        )
        .bind(&current.title)
        .bind(&current.description)
        .bind(current.deadline)
        .bind(current.priority)
        .bind(current.status)
        .bind(id)
        .execute(&self.db)
        .await?;

        current.subtasks = sqlx::query_as::<_, Subtask>(
            "SELECT id, task_id, title, deadline, is_completed, created_at FROM subtasks WHERE task_id = ? ORDER BY created_at ASC"
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(current))
    }

    async fn delete_task(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }

    async fn create_subtask(
        &self,
        task_id: &str,
        req: NewSubtaskRequest,
    ) -> Result<Option<Subtask>, AppError> {
        if self.find_task(task_id).await?.is_none() {
            return Ok(None);
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO subtasks (id, task_id, title, deadline, is_completed, created_at) VALUES (?, ?, ?, ?, 0, ?)"
        )
        .bind(&id)
        .bind(task_id)
        .bind(&req.title)
        .bind(req.deadline)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Some(Subtask {
            id,
            task_id: task_id.to_string(),
            title: req.title,
            deadline: req.deadline,
            is_completed: false,
            created_at: now,
        }))
    }

    async fn toggle_subtask(
        &self,
        task_id: &str,
        subtask_id: &str,
    ) -> Result<Option<Subtask>, AppError> {
        let mut current = match self.find_subtask(task_id, subtask_id).await? {
            Some(st) => st,
            None => return Ok(None),
        };

        current.is_completed = !current.is_completed;

        sqlx::query("UPDATE subtasks SET is_completed = ? WHERE id = ? AND task_id = ?")
            .bind(current.is_completed)
            .bind(subtask_id)
            .bind(task_id)
            .execute(&self.db)
            .await?;

        Ok(Some(current))
    }

    async fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM subtasks WHERE id = ? AND task_id = ?")
            .bind(subtask_id)
            .bind(task_id)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }

    async fn list_daily_tasks(&self, since: NaiveDate) -> Result<Vec<DailyTask>, AppError> {
        let tasks = sqlx::query_as::<_, DailyTask>(
            "SELECT id, title, task_date, is_completed, completed_at, created_at FROM daily_tasks WHERE task_date >= ? ORDER BY task_date DESC, created_at ASC"
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(tasks)
    }

    async fn create_daily_task(&self, req: NewDailyTaskRequest) -> Result<DailyTask, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO daily_tasks (id, title, task_date, is_completed, completed_at, created_at) VALUES (?, ?, ?, 0, NULL, ?)"
        )
        .bind(&id)
        .bind(&req.title)
        .bind(req.task_date)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(DailyTask {
            id,
            title: req.title,
            task_date: req.task_date,
            is_completed: false,
            completed_at: None,
            created_at: now,
        })
    }

    async fn toggle_daily_task(&self, id: &str) -> Result<Option<DailyTask>, AppError> {
        let mut current = match self.find_daily_task(id).await? {
            Some(t) => t,
            None => return Ok(None),
        };

        current.is_completed = !current.is_completed;
        current.completed_at = current.is_completed.then(Utc::now);

        sqlx::query("UPDATE daily_tasks SET is_completed = ?, completed_at = ? WHERE id = ?")
            .bind(current.is_completed)
            .bind(current.completed_at)
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(Some(current))
    }

    async fn delete_daily_task(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM daily_tasks WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }

    async fn purge_daily_tasks_before(&self, cutoff: NaiveDate) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM daily_tasks WHERE task_date < ?")
            .bind(cutoff)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::models::Priority;

    async fn setup_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        SqliteStore::new(pool)
    }

    fn new_task(title: &str, priority: Priority) -> NewTaskRequest {
        NewTaskRequest {
            title: title.to_string(),
            description: None,
            deadline: None,
            priority,
        }
    }

    fn new_subtask(title: &str, deadline: NaiveDate) -> NewSubtaskRequest {
        NewSubtaskRequest {
            title: title.to_string(),
            deadline,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_tasks_with_subtasks() {
        let store = setup_store().await;

        let task = store
            .create_task(new_task("Thesis", Priority::High))
            .await
            .expect("Failed to create task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.subtasks.is_empty());

        let subtask = store
            .create_subtask(&task.id, new_subtask("Draft outline", date(2024, 6, 12)))
            .await
            .expect("Failed to create subtask")
            .expect("Parent task missing");
        assert!(!subtask.is_completed);

        let tasks = store.list_tasks().await.expect("Failed to list tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].subtasks.len(), 1);
        assert_eq!(tasks[0].subtasks[0].id, subtask.id);
    }

    #[tokio::test]
    async fn test_create_subtask_requires_parent() {
        let store = setup_store().await;

        let result = store
            .create_subtask("missing", new_subtask("Orphan", date(2024, 6, 12)))
            .await
            .expect("Query failed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_task_applies_partial_fields() {
        let store = setup_store().await;

        let task = store
            .create_task(new_task("Reading list", Priority::Low))
            .await
            .expect("Failed to create task");

        let updated = store
            .update_task(
                &task.id,
                UpdateTaskRequest {
                    title: Some("Reading list v2".to_string()),
                    description: None,
                    deadline: None,
                    priority: Some(Priority::Medium),
                    status: Some(TaskStatus::Done),
                },
            )
            .await
            .expect("Failed to update task")
            .expect("Task not found");

        assert_eq!(updated.title, "Reading list v2");
        assert_eq!(updated.priority, Priority::Medium);
        assert_eq!(updated.status, TaskStatus::Done);

        let missing = store
            .update_task(
                "missing",
                UpdateTaskRequest {
                    title: None,
                    description: None,
                    deadline: None,
                    priority: None,
                    status: None,
                },
            )
            .await
            .expect("Query failed");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_toggle_subtask_flips_completion() {
        let store = setup_store().await;

        let task = store
            .create_task(new_task("Thesis", Priority::High))
            .await
            .expect("Failed to create task");
        let subtask = store
            .create_subtask(&task.id, new_subtask("Draft outline", date(2024, 6, 12)))
            .await
            .expect("Failed to create subtask")
            .expect("Parent task missing");

        let toggled = store
            .toggle_subtask(&task.id, &subtask.id)
            .await
            .expect("Failed to toggle")
            .expect("Subtask not found");
        assert!(toggled.is_completed);

        let toggled_back = store
            .toggle_subtask(&task.id, &subtask.id)
            .await
            .expect("Failed to toggle")
            .expect("Subtask not found");
        assert!(!toggled_back.is_completed);
    }

    #[tokio::test]
    async fn test_delete_task_cascades_to_subtasks() {
        let store = setup_store().await;

        let task = store
            .create_task(new_task("Thesis", Priority::High))
            .await
            .expect("Failed to create task");
        store
            .create_subtask(&task.id, new_subtask("Draft outline", date(2024, 6, 12)))
            .await
            .expect("Failed to create subtask")
            .expect("Parent task missing");

        assert!(store.delete_task(&task.id).await.expect("Delete failed"));

        let tasks = store.list_tasks().await.expect("Failed to list tasks");
        assert!(tasks.is_empty());

        let orphan_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subtasks")
            .fetch_one(&store.db)
            .await
            .expect("Count failed");
        assert_eq!(orphan_count, 0);
    }

    #[tokio::test]
    async fn test_toggle_daily_task_tracks_completed_at() {
        let store = setup_store().await;

        let task = store
            .create_daily_task(NewDailyTaskRequest {
                title: "Water plants".to_string(),
                task_date: date(2024, 6, 10),
            })
            .await
            .expect("Failed to create daily task");
        assert!(task.completed_at.is_none());

        let done = store
            .toggle_daily_task(&task.id)
            .await
            .expect("Failed to toggle")
            .expect("Daily task not found");
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());

        let undone = store
            .toggle_daily_task(&task.id)
            .await
            .expect("Failed to toggle")
            .expect("Daily task not found");
        assert!(!undone.is_completed);
        assert!(undone.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_list_daily_tasks_filters_and_orders() {
        let store = setup_store().await;

        for (title, day) in [("old", 1), ("kept", 8), ("today", 10)] {
            store
                .create_daily_task(NewDailyTaskRequest {
                    title: title.to_string(),
                    task_date: date(2024, 6, day),
                })
                .await
                .expect("Failed to create daily task");
        }

        let listed = store
            .list_daily_tasks(date(2024, 6, 4))
            .await
            .expect("Failed to list daily tasks");
        let titles: Vec<&str> = listed.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["today", "kept"]);
    }

    #[tokio::test]
    async fn test_purge_daily_tasks_is_idempotent() {
        let store = setup_store().await;

        let today = date(2024, 6, 10);
        for offset in [0, 3, 7, 9] {
            store
                .create_daily_task(NewDailyTaskRequest {
                    title: format!("{offset} days back"),
                    task_date: today - Duration::days(offset),
                })
                .await
                .expect("Failed to create daily task");
        }

        let cutoff = crate::retention::retention_floor(today);
        let purged = store
            .purge_daily_tasks_before(cutoff)
            .await
            .expect("Purge failed");
        assert_eq!(purged, 2);

        let purged_again = store
            .purge_daily_tasks_before(cutoff)
            .await
            .expect("Purge failed");
        assert_eq!(purged_again, 0);

        let remaining = store
            .list_daily_tasks(date(2024, 1, 1))
            .await
            .expect("Failed to list daily tasks");
        assert_eq!(remaining.len(), 2);
    }
}
