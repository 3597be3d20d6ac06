use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::billing::BillingLedger;
use crate::config::settings::AppSettings;
use crate::domain::caller::Caller;
use crate::domain::task::{Priority, SourceType, Task, TaskOwner};
use crate::error::{AppError, AppResult};
use crate::providers::PlatformMetadataProvider;
use crate::storage::Storage;

/// Component C: task admission (spec.md S4.1). Validates the request,
/// enforces the trial gate, then inserts the task under the storage
/// layer's per-owner concurrency guard.
pub struct TaskAdmission {
    storage: Arc<dyn Storage>,
    billing: Arc<BillingLedger>,
    platform_metadata: Arc<dyn PlatformMetadataProvider>,
    settings: Arc<AppSettings>,
}

impl TaskAdmission {
    pub fn new(
        storage: Arc<dyn Storage>,
        billing: Arc<BillingLedger>,
        platform_metadata: Arc<dyn PlatformMetadataProvider>,
        settings: Arc<AppSettings>,
    ) -> Self {
        Self { storage, billing, platform_metadata, settings }
    }

    /// Six-step admission pipeline (spec.md S4.1):
    /// 1. validate the request shape and resolve the effective trial flag
    /// 2. resolve trial duration cap via platform metadata, when trial
    /// 3. reject an already-used trial, or an insufficient balance when not
    /// 4. resolve priority from the caller's account state
    /// 5. insert the pending task under the per-owner concurrency gate
    /// 6. record trial usage once admission succeeds
    #[instrument(skip(self, params), fields(source_type = ?source_type))]
    pub async fn create_task(
        &self,
        caller: &Caller,
        source_type: SourceType,
        source_url: String,
        params: Value,
        is_trial: bool,
    ) -> AppResult<Task> {
        if source_url.trim().is_empty() {
            return Err(AppError::InvalidInput("source_url must not be empty".to_string()));
        }

        let owner_key = caller.owner_key().ok_or_else(|| AppError::Unauthorized("no caller identity".to_string()))?;

        // An unauthenticated caller never has a balance to charge, so every
        // anonymous submission is a trial regardless of the request flag.
        let effective_trial = is_trial || !caller.authenticated;

        if effective_trial {
            let already_used = self
                .billing
                .check_trial_used(caller.user_id, caller.anon_id.as_deref())
                .await?;
            if already_used {
                return Err(AppError::TrialExhausted("trial already used for this owner".to_string()));
            }

            let metadata = self.platform_metadata.lookup(&source_url).await?;
            let max_seconds = self.settings.trial.max_duration_minutes as f64 * 60.0;
            if metadata.duration_seconds > max_seconds {
                return Err(AppError::DurationExceeded(format!(
                    "trial videos are capped at {} minutes",
                    self.settings.trial.max_duration_minutes
                )));
            }
        } else if let Some(user_id) = caller.user_id {
            let balance = self.billing.balance_minutes(user_id).await?;
            if balance <= 0 {
                return Err(AppError::InsufficientBalance("balance must be positive to start a task".to_string()));
            }
        }

        let priority = if caller.authenticated && !effective_trial { Priority::Paid } else { Priority::Free };

        let owner = TaskOwner {
            user_id: caller.user_id,
            anon_id: caller.anon_id.clone(),
        };

        let task = Task::new(owner, source_type, source_url, params, effective_trial, priority);
        let inserted = self.storage.insert_pending_task(task).await?;

        if effective_trial {
            self.billing.record_trial(caller.user_id, caller.anon_id.clone()).await?;
        }

        info!(task_id = %inserted.id, owner = ?owner_key, "task admitted");
        Ok(inserted)
    }
}
