use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::task::{Priority, SourceType, Task, TaskStatus};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub source_type: SourceType,
    pub source_url: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub is_trial: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub cursor: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub source_type: SourceType,
    pub source_url: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub is_trial: bool,
    pub engine: Option<String>,
    pub duration_sec: Option<f64>,
    pub cost_minutes: Option<i64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            source_type: task.source_type,
            source_url: task.source_url,
            status: task.status,
            priority: task.priority,
            is_trial: task.is_trial,
            engine: task.engine,
            duration_sec: task.duration_sec,
            cost_minutes: task.cost_minutes,
            error: task.error,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_id: String,
    pub user_id: Uuid,
    pub anon_id: Option<String>,
}
