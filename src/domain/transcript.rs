use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::segment::Segment;

/// 1:1 with a succeeded Task (spec.md S3). Never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub task_id: Uuid,
    pub segments: Vec<Segment>,
    pub raw_provider_payload: Value,
    pub srt_url: Option<String>,
    pub vtt_url: Option<String>,
    pub raw_json_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    pub fn new(task_id: Uuid, segments: Vec<Segment>, raw_provider_payload: Value) -> Self {
        Self {
            task_id,
            segments,
            raw_provider_payload,
            srt_url: None,
            vtt_url: None,
            raw_json_url: None,
            created_at: Utc::now(),
        }
    }
}
