use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppResult;
use crate::storage::Storage;

/// Metering and settlement ledger (spec.md S4.6): deducts/credits minutes
/// and tracks trial usage, delegating the actual atomic updates to the
/// storage layer's conditional SQL.
pub struct BillingLedger {
    storage: Arc<dyn Storage>,
}

impl BillingLedger {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Deducts `minutes` from the user's balance. Returns `false` (never an
    /// error) when the balance is insufficient, per spec.md S4.6 and Open
    /// Question 3: settlement never fails the task outright.
    pub async fn deduct(&self, user_id: Uuid, minutes: i64) -> AppResult<bool> {
        self.storage.deduct_balance(user_id, minutes).await
    }

    pub async fn add(&self, user_id: Uuid, minutes: i64) -> AppResult<()> {
        self.storage.add_balance(user_id, minutes).await
    }

    pub async fn balance_minutes(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(self.storage.get_balance(user_id).await?.minutes_balance)
    }

    /// Records that a trial was consumed by this owner, at-most-once per
    /// owner (spec.md S3 invariant I4).
    pub async fn record_trial(&self, user_id: Option<Uuid>, anon_id: Option<String>) -> AppResult<()> {
        self.storage.record_trial_usage(user_id, anon_id).await
    }

    pub async fn check_trial_used(&self, user_id: Option<Uuid>, anon_id: Option<&str>) -> AppResult<bool> {
        self.storage.check_trial_used(user_id, anon_id).await
    }

    /// Transfers a trial-usage record from an anonymous caller to the user
    /// account it binds to on sign-up (spec.md S4.6 "bind_trial_to_user").
    pub async fn bind_trial_to_user(&self, user_id: Uuid, anon_id: &str) -> AppResult<()> {
        self.storage.bind_trial_to_user(user_id, anon_id).await
    }
}
