use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::executor::TaskExecutor;
use crate::storage::Storage;

use super::Dispatcher;

/// In-process cooperative dispatcher (spec.md S4.2 "inline mode"): a single
/// worker loop drained by an mpsc channel. Used when `QUEUE_ENABLED=false`.
pub struct InlineDispatcher {
    sender: mpsc::UnboundedSender<Uuid>,
}

impl InlineDispatcher {
    /// Spawns the worker loop and replays any tasks left `pending` from a
    /// previous process (spec.md Open Question 1: re-enqueue at startup).
    pub async fn start(executor: Arc<TaskExecutor>, storage: Arc<dyn Storage>) -> AppResult<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Uuid>();

        tokio::spawn(async move {
            while let Some(task_id) = receiver.recv().await {
                if let Err(e) = executor.execute(task_id).await {
                    error!(task_id = %task_id, error = %e, "inline dispatch failed");
                }
            }
        });

        let dispatcher = Self { sender };

        let pending = storage.list_pending_tasks().await?;
        info!(count = pending.len(), "re-enqueuing pending tasks at startup");
        for task in pending {
            dispatcher.dispatch(task.id).await?;
        }

        Ok(dispatcher)
    }
}

#[async_trait]
impl Dispatcher for InlineDispatcher {
    async fn dispatch(&self, task_id: Uuid) -> AppResult<()> {
        self.sender
            .send(task_id)
            .map_err(|_| AppError::Internal("inline dispatcher worker loop has stopped".to_string()))?;
        debug!(task_id = %task_id, "task queued for inline dispatch");
        Ok(())
    }
}
