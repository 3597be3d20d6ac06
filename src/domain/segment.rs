use serde::{Deserialize, Serialize};

/// A single subtitle line: `(start, end, text, speaker?)` with
/// `0 <= start <= end` and non-empty trimmed text (spec.md S3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker: Option<String>,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>, speaker: Option<String>) -> Self {
        Self { start, end, text: text.into(), speaker }
    }

    pub fn is_valid(&self) -> bool {
        self.start >= 0.0 && self.start <= self.end && !self.text.trim().is_empty()
    }
}
