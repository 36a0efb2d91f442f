//! # Events
//!
//! Typed run events: progress reports and per-task completions. They reach
//! the caller's synchronous callbacks first and a bounded broadcast channel
//! second. [`ProgressTracker`] owns the ordering guarantees so listeners can
//! consume events as they arrive.

pub mod progress;
pub mod publisher;
pub mod types;

pub use progress::{ProgressSink, ProgressTracker};
pub use publisher::EventPublisher;
pub use types::{PipelineEvent, RunProgress, RunStage};
