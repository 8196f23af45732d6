use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasklane::db::{SqliteStore, TaskStore};
use tasklane::retention;
use tasklane::routes::router;
use tasklane::services::RetentionSweeper;
use tasklane::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tasklane=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://tasklane.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<dyn TaskStore> = Arc::new(SqliteStore::new(pool.clone()));

    // One purge per session start; the background sweeper repeats it.
    let cutoff = retention::retention_floor(Utc::now().date_naive());
    let purged = store.purge_daily_tasks_before(cutoff).await?;
    info!("Startup retention purge removed {} daily tasks", purged);

    let sweep_secs = std::env::var("RETENTION_SWEEP_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(86_400);
    tokio::spawn(RetentionSweeper::new(store.clone(), sweep_secs).start());

    let state = AppState { db: pool, store };

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
