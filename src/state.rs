use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::TaskStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn TaskStore>,
}
