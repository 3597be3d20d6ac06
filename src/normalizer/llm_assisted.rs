use crate::domain::segment::Segment;
use crate::providers::LlmProvider;

/// Runs the optional LLM-assisted merge pass on top of the rule-based
/// result. Merge has a safe fallback (the rule-based segments themselves),
/// so provider failures never fail the task (spec.md S4.4.4).
pub async fn refine_merge(llm: &dyn LlmProvider, segments: Vec<Segment>) -> Vec<Segment> {
    if segments.is_empty() {
        return segments;
    }
    llm.merge(&segments).await.unwrap_or(segments)
}

/// Runs translation when the caller requested a target language different
/// from the detected/native one. Unlike merge, translation has no
/// rule-based fallback, so provider failures propagate (spec.md S4.4.4).
pub async fn translate(
    llm: &dyn LlmProvider,
    segments: Vec<Segment>,
    target_language: &str,
) -> crate::error::AppResult<Vec<Segment>> {
    if segments.is_empty() {
        return Ok(segments);
    }
    llm.translate(&segments, target_language).await
}
