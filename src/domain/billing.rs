use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `(user_id, minutes_balance >= 0, updated_at)` — one row per user (spec.md
/// S3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: Uuid,
    pub minutes_balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// `(anon_id, ip_hash, ua_hash, used_trial)` — created on first trial
/// admission (spec.md S3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonToken {
    pub anon_id: String,
    pub ip_hash: String,
    pub ua_hash: String,
    pub used_trial: bool,
}

/// Append-only audit row; at least one of the ids is non-null (spec.md S3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialUsage {
    pub user_id: Option<Uuid>,
    pub anon_id: Option<String>,
    pub used_at: DateTime<Utc>,
}
