pub mod auto_transcript;
pub mod llm;
pub mod platform_metadata;
pub mod sync_stt;

pub use auto_transcript::{AutoTranscriptMode, AutoTranscriptProvider, HttpAutoTranscriptProvider, RawChunk, TranscriptResult};
pub use llm::{HttpLlmProvider, LlmProvider};
pub use platform_metadata::{HttpPlatformMetadataProvider, PlatformMetadataProvider, VideoMetadata};
pub use sync_stt::{HttpSyncSttProvider, SyncSttProvider, SyncSttResult};
