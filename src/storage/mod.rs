pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::caller::OwnerKey;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::{Balance, Transcript};
use crate::error::AppResult;

/// Component A (spec.md S4 table, S6): CRUD over persisted entities, atomic
/// balance update, stuck-task scan query. Abstracted behind a trait so the
/// executor/admission/sweeper depend on an interface, not a concrete
/// database (REDESIGN FLAG: explicit constructor-wired components).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts a new pending Task, atomically enforcing the per-owner
    /// concurrency gate (spec.md S4.1 step 4-5, invariant I2): if the owner
    /// already has a task with `status IN (pending, processing)`, returns
    /// `AppError::Conflict` and inserts nothing.
    async fn insert_pending_task(&self, task: Task) -> AppResult<Task>;

    async fn get_task(&self, task_id: Uuid) -> AppResult<Task>;

    /// Lists tasks for an owner (or all owners, if `owner` is `None`),
    /// optionally filtered by status, newest first, paginated by
    /// `created_at` cursor (spec.md S6 `GET /tasks`).
    async fn list_tasks(
        &self,
        owner: Option<OwnerKey>,
        status: Option<TaskStatus>,
        cursor: Option<chrono::DateTime<chrono::Utc>>,
        limit: i64,
    ) -> AppResult<Vec<Task>>;

    /// Conditional `pending -> processing` transition (spec.md S4.3 step 1).
    /// Returns `true` iff this call performed the transition; `false` means
    /// another worker already picked up the task (at-least-once delivery,
    /// spec.md S5).
    async fn start_processing(&self, task_id: Uuid) -> AppResult<bool>;

    /// Terminal `processing -> {succeeded, failed}` transition, writing the
    /// write-once outputs (spec.md S3 invariant I3/I4).
    async fn finish_task(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        duration_sec: Option<f64>,
        cost_minutes: Option<i64>,
        error: Option<String>,
        engine: Option<String>,
    ) -> AppResult<()>;

    /// All rows still `pending` — used by the in-process dispatcher's
    /// startup recovery (spec.md S4.2, Open Question 1).
    async fn list_pending_tasks(&self) -> AppResult<Vec<Task>>;

    /// Batch `processing -> failed` for rows stuck past the timeout
    /// threshold (spec.md S4.7). Returns the number of rows updated.
    async fn sweep_stuck_tasks(&self, timeout_minutes: i64) -> AppResult<u64>;

    /// Upsert keyed on `task_id` — idempotent under dispatcher retries
    /// (spec.md S4.3 step 5).
    async fn upsert_transcript(&self, transcript: Transcript) -> AppResult<()>;

    async fn get_balance(&self, user_id: Uuid) -> AppResult<Balance>;

    /// Conditional `balance - minutes`, atomic guard (spec.md S4.6
    /// `deduct`). Returns `true` iff the deduction applied.
    async fn deduct_balance(&self, user_id: Uuid, minutes: i64) -> AppResult<bool>;

    /// Insert-or-update, creating a zero-based row if missing (spec.md S4.6
    /// `add`).
    async fn add_balance(&self, user_id: Uuid, minutes: i64) -> AppResult<()>;

    async fn record_trial_usage(&self, user_id: Option<Uuid>, anon_id: Option<String>) -> AppResult<()>;

    async fn check_trial_used(&self, user_id: Option<Uuid>, anon_id: Option<&str>) -> AppResult<bool>;

    async fn bind_trial_to_user(&self, user_id: Uuid, anon_id: &str) -> AppResult<()>;

    /// Webhook idempotency: attempts to acquire a processing lock for
    /// `(provider, event_id)`. Returns `true` iff this call acquired the
    /// lock (spec.md S7 "already-processed events return 200 without
    /// reprocessing").
    async fn try_acquire_webhook_lock(&self, provider: &str, event_id: &str) -> AppResult<bool>;

    async fn mark_webhook_completed(&self, provider: &str, event_id: &str) -> AppResult<()>;
}
