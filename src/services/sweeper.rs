use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::db::TaskStore;
use crate::error::AppError;
use crate::retention;

/// Periodic retention sweep.
/// Deletes daily tasks whose date has left the 7-day window.
pub struct RetentionSweeper {
    store: Arc<dyn TaskStore>,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn TaskStore>, interval_secs: u64) -> Self {
        Self {
            store,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Sweeps forever at the configured interval.
    pub async fn start(self) {
        info!("Starting retention sweeper (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_purge().await {
                Ok(purged) => {
                    if purged > 0 {
                        info!("Retention sweep removed {} daily tasks", purged);
                    }
                }
                Err(e) => {
                    tracing::warn!("Retention sweep failed: {:?}", e);
                    // エラーが発生してもループは継続
                }
            }
        }
    }

    async fn run_purge(&self) -> Result<u64, AppError> {
        let cutoff = retention::retention_floor(Utc::now().date_naive());
        self.store.purge_daily_tasks_before(cutoff).await
    }
}
