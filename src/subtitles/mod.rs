//! Subtitle block formatting (spec.md S4.5).

pub mod srt;
pub mod vtt;

pub use srt::format_srt;
pub use vtt::format_vtt;
