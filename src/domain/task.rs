use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Task lifecycle state (spec.md S3 invariant I1: pending -> processing ->
/// {succeeded, failed}, no path returns to an earlier state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Upload,
    Url,
    Youtube,
}

impl SourceType {
    /// spec.md S4.3 step 2: youtube (and any auto-captioned platform URL)
    /// always routes through the auto-transcript provider, never sync STT
    /// (Open Question 2, resolved in DESIGN.md).
    pub fn routes_to_auto_transcript(self) -> bool {
        matches!(self, SourceType::Youtube)
    }
}

/// Scheduling priority (spec.md S3, S4.1 step 5): paid is dequeued before
/// free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Paid,
    Free,
}

impl Priority {
    /// Numeric ordering for the priority queue: smaller is more urgent
    /// (spec.md S4.2).
    pub fn rank(self) -> u8 {
        match self {
            Priority::Paid => 0,
            Priority::Free => 1,
        }
    }
}

/// Owner of a task: exactly one of `user_id` or `anon_id` is set (spec.md
/// S3 invariant: "never both null").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOwner {
    pub user_id: Option<Uuid>,
    pub anon_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner: TaskOwner,
    pub source_type: SourceType,
    pub source_url: String,
    pub params: Value,
    pub is_trial: bool,
    pub priority: Priority,
    pub status: TaskStatus,
    pub engine: Option<String>,
    pub duration_sec: Option<f64>,
    pub cost_minutes: Option<i64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(owner: TaskOwner, source_type: SourceType, source_url: String, params: Value, is_trial: bool, priority: Priority) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            source_type,
            source_url,
            params,
            is_trial,
            priority,
            status: TaskStatus::Pending,
            engine: None,
            duration_sec: None,
            cost_minutes: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Target subtitle language, if the caller asked for one (spec.md S3
    /// "recognized keys: language").
    pub fn target_language(&self) -> Option<&str> {
        self.params.get("language").and_then(|v| v.as_str())
    }

    pub fn detect_language(&self) -> bool {
        self.params
            .get("detect_language")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
