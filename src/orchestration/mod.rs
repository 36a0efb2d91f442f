//! # Orchestration
//!
//! The fan-out/fan-in half of the pipeline.
//!
//! ## Core Components
//!
//! - **Task graph builder**: one `view_generation` task per suggested view plus
//!   a single `integration_setup` task depending on all of them
//! - **TaskScheduler**: dependency-aware, concurrency-capped execution with
//!   priority tie-breaking, per-attempt timeouts, retries and cancellation
//! - **Response merger**: validates and folds task outputs, tolerating failure
//! - **Prototype assembler**: builds the final artifact
//! - **PrototypePipeline**: runs every stage and reports progress

pub mod pipeline;
pub mod prototype_assembler;
pub mod response_merger;
pub mod scheduler;
pub mod task_graph;
pub mod types;

pub use pipeline::{PipelineOutcome, PrototypePipeline};
pub use prototype_assembler::{assemble, GeneratedArtifact, PrototypeConfiguration, SchemaRecord};
pub use response_merger::{merge, MergeStats, MergedConfiguration};
pub use scheduler::{validate_graph, TaskScheduler, TaskState};
pub use task_graph::build_tasks;
pub use types::{
    ExpectedOutput, GeneratedComponent, GenerationOptions, GenerationPreferences,
    IntegrationBundle, RouteEntry, SubagentConfig, Task, TaskKind, TaskMetadata, TaskResult,
    ThemeMode,
};
