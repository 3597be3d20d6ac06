use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::caller::OwnerKey;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::{Balance, Transcript};
use crate::error::{AppError, AppResult};

use super::Storage;

/// In-memory `Storage` used by tests (spec.md S8 properties P1-P4, P8):
/// exercises the same state-machine guards and atomic-update semantics as
/// `PgStorage` without requiring a live Postgres instance.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<Uuid, Task>,
    transcripts: HashMap<Uuid, Transcript>,
    balances: HashMap<Uuid, Balance>,
    trial_usages: Vec<(Option<Uuid>, Option<String>, DateTime<Utc>)>,
    anon_used_trial: HashMap<String, bool>,
    webhook_locks: HashMap<(String, String), bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owner_matches(task: &Task, owner: &OwnerKey) -> bool {
    match owner {
        OwnerKey::User(id) => task.owner.user_id == Some(*id),
        OwnerKey::Anon(id) => task.owner.anon_id.as_deref() == Some(id.as_str()),
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_pending_task(&self, task: Task) -> AppResult<Task> {
        let mut inner = self.inner.lock().unwrap();
        let owner_key = if let Some(user_id) = task.owner.user_id {
            OwnerKey::User(user_id)
        } else if let Some(anon_id) = task.owner.anon_id.clone() {
            OwnerKey::Anon(anon_id)
        } else {
            return Err(AppError::InvalidInput("task has no owner".to_string()));
        };

        let has_active = inner.tasks.values().any(|t| {
            owner_matches(t, &owner_key) && matches!(t.status, TaskStatus::Pending | TaskStatus::Processing)
        });
        if has_active {
            return Err(AppError::Conflict("owner already has an in-flight task".to_string()));
        }

        inner.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, task_id: Uuid) -> AppResult<Task> {
        let inner = self.inner.lock().unwrap();
        inner.tasks.get(&task_id).cloned().ok_or_else(|| AppError::NotFound(format!("task {} not found", task_id)))
    }

    async fn list_tasks(
        &self,
        owner: Option<OwnerKey>,
        status: Option<TaskStatus>,
        cursor: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<Task>> {
        let inner = self.inner.lock().unwrap();
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| owner.as_ref().map(|o| owner_matches(t, o)).unwrap_or(true))
            .filter(|t| status.map(|s| t.status == s).unwrap_or(true))
            .filter(|t| cursor.map(|c| t.created_at < c).unwrap_or(true))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks.truncate(limit.max(0) as usize);
        Ok(tasks)
    }

    async fn start_processing(&self, task_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.tasks.get_mut(&task_id) {
            Some(task) if task.status == TaskStatus::Pending => {
                task.status = TaskStatus::Processing;
                task.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finish_task(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        duration_sec: Option<f64>,
        cost_minutes: Option<i64>,
        error: Option<String>,
        engine: Option<String>,
    ) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner.tasks.get_mut(&task_id) {
            if task.status == TaskStatus::Processing {
                task.status = status;
                task.duration_sec = duration_sec;
                task.cost_minutes = cost_minutes;
                task.error = error;
                task.engine = engine;
                task.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn list_pending_tasks(&self) -> AppResult<Vec<Task>> {
        let inner = self.inner.lock().unwrap();
        let mut tasks: Vec<Task> = inner.tasks.values().filter(|t| t.status == TaskStatus::Pending).cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn sweep_stuck_tasks(&self, timeout_minutes: i64) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let threshold = Utc::now() - chrono::Duration::minutes(timeout_minutes);
        let mut count = 0;
        for task in inner.tasks.values_mut() {
            if task.status == TaskStatus::Processing && task.updated_at < threshold {
                task.status = TaskStatus::Failed;
                task.error = Some("task timeout".to_string());
                task.updated_at = Utc::now();
                count += 1;
            }
        }
        Ok(count)
    }

    async fn upsert_transcript(&self, transcript: Transcript) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.transcripts.insert(transcript.task_id, transcript);
        Ok(())
    }

    async fn get_balance(&self, user_id: Uuid) -> AppResult<Balance> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.balances.get(&user_id).cloned().unwrap_or(Balance {
            user_id,
            minutes_balance: 0,
            updated_at: Utc::now(),
        }))
    }

    async fn deduct_balance(&self, user_id: Uuid, minutes: i64) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let balance = inner.balances.entry(user_id).or_insert(Balance {
            user_id,
            minutes_balance: 0,
            updated_at: Utc::now(),
        });
        if balance.minutes_balance >= minutes {
            balance.minutes_balance -= minutes;
            balance.updated_at = Utc::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn add_balance(&self, user_id: Uuid, minutes: i64) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let balance = inner.balances.entry(user_id).or_insert(Balance {
            user_id,
            minutes_balance: 0,
            updated_at: Utc::now(),
        });
        balance.minutes_balance += minutes;
        balance.updated_at = Utc::now();
        Ok(())
    }

    async fn record_trial_usage(&self, user_id: Option<Uuid>, anon_id: Option<String>) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.trial_usages.push((user_id, anon_id.clone(), Utc::now()));
        if let Some(anon_id) = anon_id {
            inner.anon_used_trial.insert(anon_id, true);
        }
        Ok(())
    }

    async fn check_trial_used(&self, user_id: Option<Uuid>, anon_id: Option<&str>) -> AppResult<bool> {
        let inner = self.inner.lock().unwrap();
        if let Some(user_id) = user_id {
            if inner.trial_usages.iter().any(|(u, _, _)| *u == Some(user_id)) {
                return Ok(true);
            }
        }
        if let Some(anon_id) = anon_id {
            if *inner.anon_used_trial.get(anon_id).unwrap_or(&false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn bind_trial_to_user(&self, user_id: Uuid, anon_id: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        for usage in inner.trial_usages.iter_mut() {
            if usage.1.as_deref() == Some(anon_id) {
                usage.0 = Some(user_id);
                usage.1 = None;
            }
        }
        Ok(())
    }

    async fn try_acquire_webhook_lock(&self, provider: &str, event_id: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let key = (provider.to_string(), event_id.to_string());
        if inner.webhook_locks.contains_key(&key) {
            Ok(false)
        } else {
            inner.webhook_locks.insert(key, false);
            Ok(true)
        }
    }

    async fn mark_webhook_completed(&self, provider: &str, event_id: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.webhook_locks.insert((provider.to_string(), event_id.to_string()), true);
        Ok(())
    }
}
