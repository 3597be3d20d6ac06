use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::settings::SweeperConfig;
use crate::storage::Storage;

/// Component I: stuck-task recovery (spec.md S4.7). Runs on a fixed
/// interval and fails any task left `processing` past the timeout, so a
/// crashed worker never leaves a task stuck forever.
pub struct Sweeper {
    storage: Arc<dyn Storage>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(storage: Arc<dyn Storage>, config: SweeperConfig) -> Self {
        Self { storage, config }
    }

    /// Spawns the sweep loop, mirroring the billing reconciliation loop's
    /// tokio::spawn + fixed-interval sleep shape.
    pub fn spawn(self: Arc<Self>) {
        tokio::spawn(async move {
            let interval = Duration::from_secs(self.config.sweep_interval_seconds);
            loop {
                match self.storage.sweep_stuck_tasks(self.config.task_timeout_minutes).await {
                    Ok(count) if count > 0 => info!(count, "swept stuck tasks"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "stuck-task sweep failed"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
