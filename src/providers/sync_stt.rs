use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::settings::AppSettings;
use crate::domain::segment::Segment;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Word {
    pub word: String,
    pub punctuated_word: Option<String>,
    pub start: f64,
    pub end: f64,
    pub speaker: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Utterance {
    pub start: f64,
    pub end: f64,
    pub transcript: String,
    pub speaker: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct Alternative {
    #[serde(default)]
    words: Vec<Word>,
}

#[derive(Debug, Clone, Deserialize)]
struct Channel {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Deserialize)]
struct Results {
    channels: Vec<Channel>,
    #[serde(default)]
    utterances: Vec<Utterance>,
}

#[derive(Debug, Clone, Deserialize)]
struct Metadata {
    duration: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct SyncSttBody {
    metadata: Metadata,
    results: Results,
}

#[derive(Debug, Clone, Serialize)]
struct RequestBody<'a> {
    url: &'a str,
}

/// Result of a sync STT call, already reduced to segments (spec.md S4.4.2).
#[derive(Debug, Clone)]
pub struct SyncSttResult {
    pub segments: Vec<Segment>,
    pub duration_sec: f64,
    pub raw: serde_json::Value,
}

/// Component B (sync STT side, spec.md S4.4.2, S6).
#[async_trait]
pub trait SyncSttProvider: Send + Sync {
    async fn transcribe(&self, url: &str, language: Option<&str>, detect_language: bool) -> AppResult<SyncSttResult>;
}

pub struct HttpSyncSttProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpSyncSttProvider {
    pub fn new(client: reqwest::Client, settings: &AppSettings) -> Self {
        Self {
            client,
            base_url: settings.providers.sync_stt_base_url.clone(),
            api_key: settings.providers.sync_stt_api_key.clone(),
            model: "nova-2".to_string(),
        }
    }
}

#[async_trait]
impl SyncSttProvider for HttpSyncSttProvider {
    async fn transcribe(&self, url: &str, language: Option<&str>, detect_language: bool) -> AppResult<SyncSttResult> {
        let mut request = self
            .client
            .post(format!("{}/listen", self.base_url))
            .header("Authorization", format!("Token {}", self.api_key))
            .query(&[
                ("model", self.model.as_str()),
                ("diarize", "true"),
                ("detect_language", if detect_language { "true" } else { "false" }),
                ("punctuate", "true"),
                ("utterances", "true"),
            ]);
        if let Some(language) = language {
            request = request.query(&[("language", language)]);
        }

        let response = request.json(&RequestBody { url }).send().await?;
        let raw: serde_json::Value = response.json().await.map_err(|e| AppError::EngineError(e.to_string()))?;
        let body: SyncSttBody =
            serde_json::from_value(raw.clone()).map_err(|e| AppError::EngineError(e.to_string()))?;

        let segments = extract_segments(&body.results);
        Ok(SyncSttResult { segments, duration_sec: body.metadata.duration, raw })
    }
}

/// Segment extraction priority (spec.md S4.4.2): prefer provider-grouped
/// `utterances` when non-empty; otherwise walk the word stream and start a
/// new segment on speaker change or a >1.0s gap.
fn extract_segments(results: &Results) -> Vec<Segment> {
    if !results.utterances.is_empty() {
        return results
            .utterances
            .iter()
            .map(|u| Segment::new(u.start, u.end, u.transcript.clone(), u.speaker.map(|s| format!("Speaker {}", s))))
            .collect();
    }

    let words: Vec<&Word> = results
        .channels
        .iter()
        .flat_map(|c| c.alternatives.first())
        .flat_map(|a| a.words.iter())
        .collect();

    let mut segments = Vec::new();
    let mut current: Option<(f64, f64, Vec<String>, Option<i32>)> = None;

    for word in words {
        let text = word.punctuated_word.clone().unwrap_or_else(|| word.word.clone());
        match &mut current {
            None => current = Some((word.start, word.end, vec![text], word.speaker)),
            Some((start, end, texts, speaker)) => {
                let speaker_changed = *speaker != word.speaker;
                let gap_exceeded = word.start - *end > 1.0;
                if speaker_changed || gap_exceeded {
                    segments.push(flush_word_segment(*start, *end, texts, *speaker));
                    current = Some((word.start, word.end, vec![text], word.speaker));
                } else {
                    texts.push(text);
                    *end = word.end;
                }
            }
        }
    }
    if let Some((start, end, texts, speaker)) = current {
        segments.push(flush_word_segment(start, end, &texts, speaker));
    }

    segments
}

fn flush_word_segment(start: f64, end: f64, texts: &[String], speaker: Option<i32>) -> Segment {
    Segment::new(start, end, texts.join(" "), speaker.map(|s| format!("Speaker {}", s)))
}
