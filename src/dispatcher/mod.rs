pub mod inline;
pub mod queue;

pub use inline::InlineDispatcher;
pub use queue::QueueDispatcher;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;

/// Component E (spec.md S4.2): hands an admitted task off for execution.
/// `InlineDispatcher` runs an in-process worker loop; `QueueDispatcher`
/// relies on the storage layer's durable priority queue. Both give
/// at-least-once delivery, so the executor's `start_processing` guard is
/// what makes retries safe.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, task_id: Uuid) -> AppResult<()>;
}
