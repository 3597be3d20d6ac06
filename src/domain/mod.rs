pub mod billing;
pub mod caller;
pub mod segment;
pub mod task;
pub mod transcript;

pub use billing::{AnonToken, Balance, TrialUsage};
pub use caller::Caller;
pub use segment::Segment;
pub use task::{Priority, SourceType, Task, TaskStatus};
pub use transcript::Transcript;
