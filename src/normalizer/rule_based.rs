use crate::domain::segment::Segment;
use crate::providers::auto_transcript::RawChunk;

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', '\u{3002}', '\u{ff01}', '\u{ff1f}'];

/// Tunables for the rule-based merge (spec.md S4.4.3).
#[derive(Debug, Clone, Copy)]
pub struct MergeParams {
    pub max_gap_seconds: f64,
    pub max_length_chars: usize,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self { max_gap_seconds: 1.5, max_length_chars: 200 }
    }
}

/// Converts raw provider chunks into one-chunk-per-segment input for the
/// merge pass (spec.md S4.3 step 2 -> S4.4.3).
pub fn chunks_to_segments(chunks: &[RawChunk]) -> Vec<Segment> {
    chunks
        .iter()
        .map(|c| {
            let start = c.offset_ms as f64 / 1000.0;
            let end = (c.offset_ms + c.duration_ms) as f64 / 1000.0;
            Segment::new(start, end, c.text.trim(), None)
        })
        .filter(|s| !s.text.is_empty())
        .collect()
}

/// Joins two adjacent segment texts, inserting a single space only when
/// both boundary characters are alphanumeric (spec.md S4.4.3 "smart-join
/// rule") — CJK text, punctuation, and mixed scripts concatenate directly.
fn smart_join(left: &str, right: &str) -> String {
    let left = left.trim_end();
    let right = right.trim_start();
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }
    let last = left.chars().last().unwrap();
    let first = right.chars().next().unwrap();
    if last.is_ascii_alphanumeric() && first.is_ascii_alphanumeric() {
        format!("{} {}", left, right)
    } else {
        format!("{}{}", left, right)
    }
}

fn ends_sentence(text: &str) -> bool {
    text.trim_end().chars().last().map(|c| TERMINAL_PUNCTUATION.contains(&c)).unwrap_or(false)
}

/// Merges adjacent segments into readable subtitle units. Starts a new
/// segment whenever any of the four break conditions hold: the gap to the
/// next chunk exceeds `max_gap_seconds`, the merged text would exceed
/// `max_length_chars`, the current text already ends a sentence, or the
/// speaker changes (spec.md S4.4.3).
pub fn merge_rule_based(segments: &[Segment], params: &MergeParams) -> Vec<Segment> {
    let mut merged = Vec::new();
    let mut current: Option<Segment> = None;

    for next in segments {
        match &mut current {
            None => current = Some(next.clone()),
            Some(acc) => {
                let gap = next.start - acc.end;
                let joined_len = acc.text.chars().count() + next.text.chars().count();
                let speaker_changed = acc.speaker != next.speaker;

                let should_break = gap > params.max_gap_seconds
                    || joined_len > params.max_length_chars
                    || ends_sentence(&acc.text)
                    || speaker_changed;

                if should_break {
                    merged.push(acc.clone());
                    current = Some(next.clone());
                } else {
                    acc.text = smart_join(&acc.text, &next.text);
                    acc.end = next.end;
                }
            }
        }
    }
    if let Some(acc) = current {
        merged.push(acc);
    }

    merged.into_iter().map(|s| Segment::new(s.start, s.end, super::chinese::strip_cjk_spacing(&s.text), s.speaker)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment::new(start, end, text, None)
    }

    #[test]
    fn merges_close_fragments_without_terminal_punctuation() {
        let segments = vec![seg(0.0, 1.0, "hello"), seg(1.2, 2.0, "world")];
        let merged = merge_rule_based(&segments, &MergeParams::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "hello world");
        assert_eq!(merged[0].end, 2.0);
    }

    #[test]
    fn breaks_on_large_gap() {
        let segments = vec![seg(0.0, 1.0, "hello"), seg(5.0, 6.0, "world")];
        let merged = merge_rule_based(&segments, &MergeParams::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn breaks_after_terminal_punctuation() {
        let segments = vec![seg(0.0, 1.0, "Hello there."), seg(1.1, 2.0, "Next sentence")];
        let merged = merge_rule_based(&segments, &MergeParams::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn breaks_on_speaker_change() {
        let a = Segment::new(0.0, 1.0, "hi", Some("Speaker 1".to_string()));
        let b = Segment::new(1.1, 2.0, "there", Some("Speaker 2".to_string()));
        let merged = merge_rule_based(&[a, b], &MergeParams::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn joins_across_punctuation_boundary_without_space() {
        let segments = vec![seg(0.0, 1.0, "Hello,"), seg(1.1, 2.0, "world")];
        let merged = merge_rule_based(&segments, &MergeParams::default());
        assert_eq!(merged[0].text, "Hello,world");
    }

    #[test]
    fn joins_cjk_chunks_without_space() {
        let segments = vec![seg(0.0, 1.0, "你好"), seg(1.1, 2.0, "世界")];
        let merged = merge_rule_based(&segments, &MergeParams::default());
        assert_eq!(merged[0].text, "你好世界");
    }

    #[test]
    fn breaks_when_merged_length_exceeds_max() {
        let long_a = "a".repeat(150);
        let long_b = "b".repeat(100);
        let segments = vec![seg(0.0, 1.0, &long_a), seg(1.1, 2.0, &long_b)];
        let params = MergeParams::default();
        let merged = merge_rule_based(&segments, &params);
        assert_eq!(merged.len(), 2);
    }
}
