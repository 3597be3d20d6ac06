use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::settings::AppSettings;
use crate::domain::segment::Segment;
use crate::error::{AppError, AppResult};

const MERGE_SYSTEM_PROMPT: &str = "You merge adjacent subtitle segments into natural reading units. \
Respond with JSON only: {\"segments\":[{\"i\":0,\"s\":0.0,\"e\":0.0,\"t\":\"text\",\"sp\":null}]}. \
Preserve start/end timing ranges, never invent words, keep speaker labels where present.";

const TRANSLATE_SYSTEM_PROMPT: &str = "You translate subtitle segments, preserving timing and structure. \
Respond with JSON only: {\"segments\":[{\"i\":0,\"s\":0.0,\"e\":0.0,\"t\":\"translated text\",\"sp\":null}]}.";

#[derive(Debug, Clone, Serialize)]
struct WireSegment<'a> {
    i: usize,
    s: f64,
    e: f64,
    t: &'a str,
    sp: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResultSegment {
    s: f64,
    e: f64,
    t: String,
    sp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResultBody {
    segments: Vec<ResultSegment>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Component B (LLM-assisted normalization, spec.md S4.4.4). Merge failures
/// fall back to the rule-based result; translate failures are hard errors
/// since there is no non-LLM fallback for changing the language.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn merge(&self, segments: &[Segment]) -> AppResult<Vec<Segment>>;
    async fn translate(&self, segments: &[Segment], target_language: &str) -> AppResult<Vec<Segment>>;
}

pub struct HttpLlmProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpLlmProvider {
    pub fn new(client: reqwest::Client, settings: &AppSettings) -> Self {
        Self {
            client,
            base_url: settings.providers.llm_base_url.clone().unwrap_or_default(),
            api_key: settings.providers.llm_api_key.clone().unwrap_or_default(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    async fn complete(&self, system_prompt: &str, user_content: String, temperature: f64) -> AppResult<Vec<ResultSegment>> {
        let request = ChatRequest {
            model: &self.model,
            temperature,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt.to_string() },
                ChatMessage { role: "user", content: user_content },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: ChatResponse = response.json().await.map_err(|e| AppError::EngineError(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EngineError("LLM returned no choices".to_string()))?
            .message
            .content;

        let parsed: ResultBody =
            serde_json::from_str(&content).map_err(|e| AppError::EngineError(format!("LLM returned malformed JSON: {}", e)))?;
        Ok(parsed.segments)
    }
}

fn to_wire(segments: &[Segment]) -> Vec<WireSegment<'_>> {
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| WireSegment { i, s: s.start, e: s.end, t: s.text.as_str(), sp: s.speaker.as_deref() })
        .collect()
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn merge(&self, segments: &[Segment]) -> AppResult<Vec<Segment>> {
        let wire = to_wire(segments);
        let user_content = serde_json::json!({ "segments": wire }).to_string();

        match self.complete(MERGE_SYSTEM_PROMPT, user_content, 0.1).await {
            Ok(results) => Ok(results
                .into_iter()
                .map(|r| Segment::new(r.s, r.e, r.t, r.sp))
                .collect()),
            // Merge has a safe rule-based fallback; never fail task execution over this.
            Err(_) => Ok(segments.to_vec()),
        }
    }

    async fn translate(&self, segments: &[Segment], target_language: &str) -> AppResult<Vec<Segment>> {
        let wire = to_wire(segments);
        let user_content = serde_json::json!({ "target_language": target_language, "segments": wire }).to_string();

        let results = self.complete(TRANSLATE_SYSTEM_PROMPT, user_content, 0.3).await?;
        Ok(results.into_iter().map(|r| Segment::new(r.s, r.e, r.t, r.sp)).collect())
    }
}
