//! Segment normalization: turns raw provider chunks into readable subtitle
//! segments (spec.md S4.4.3, S4.4.4).

pub mod chinese;
pub mod llm_assisted;
pub mod rule_based;

pub use rule_based::{chunks_to_segments, merge_rule_based, MergeParams};
