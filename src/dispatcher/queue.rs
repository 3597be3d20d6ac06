use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;
use uuid::Uuid;

use crate::error::AppResult;
use crate::executor::TaskExecutor;
use crate::storage::Storage;

use super::Dispatcher;

/// Durable priority-queue dispatcher (spec.md S4.2 "queue mode"): a poll
/// loop claims the oldest highest-priority pending task via the storage
/// layer's conditional `pending -> processing` update (the same guard that
/// makes `SELECT ... FOR UPDATE SKIP LOCKED` safe across workers). Retry
/// with backoff on a claimed task happens inside `TaskExecutor::execute`,
/// not here. Used when `QUEUE_ENABLED=true`.
pub struct QueueDispatcher {
    storage: Arc<dyn Storage>,
}

impl QueueDispatcher {
    pub fn new(storage: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self { storage })
    }

    pub fn spawn(self: Arc<Self>, executor: Arc<TaskExecutor>) {
        tokio::spawn(async move {
            loop {
                match self.poll_once(&executor).await {
                    Ok(true) => continue,
                    Ok(false) => tokio::time::sleep(Duration::from_secs(1)).await,
                    Err(e) => {
                        error!(error = %e, "queue dispatcher poll failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    /// Fetches the pending backlog, sorts by priority then age, and runs
    /// the first task whose claim succeeds. Returns `true` if a task ran
    /// (so the caller polls again immediately instead of sleeping).
    async fn poll_once(&self, executor: &Arc<TaskExecutor>) -> AppResult<bool> {
        let mut pending = self.storage.list_pending_tasks().await?;
        pending.sort_by(|a, b| a.priority.rank().cmp(&b.priority.rank()).then(a.created_at.cmp(&b.created_at)));

        for task in pending {
            // `execute` itself performs the conditional claim; a `false`
            // claim here just means another worker already took it.
            let _ = executor.execute(task.id).await;
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl Dispatcher for QueueDispatcher {
    async fn dispatch(&self, _task_id: Uuid) -> AppResult<()> {
        // The queue dispatcher discovers work by polling `list_pending_tasks`
        // rather than being pushed to directly; admission only needs to have
        // inserted the row (spec.md S4.2).
        Ok(())
    }
}
