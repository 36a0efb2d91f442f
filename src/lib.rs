#![allow(clippy::doc_markdown)] // Allow technical terms like DBML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Prototyper Core
//!
//! Turns a DBML database schema into a generated UI prototype.
//!
//! ## Overview
//!
//! A run validates and parses the schema, maps each table to candidate views
//! (list, detail, form, dashboard, master-detail), fans those views out as
//! independent generation tasks, and fans the results back in to one
//! configuration. That configuration is assembled into a prototype artifact
//! and handed to a store.
//!
//! ## Module Organization
//!
//! - [`schema`] - DBML tokenizer, parser and structural validator
//! - [`mapping`] - Rule-based UI suggestion mapper and field type table
//! - [`orchestration`] - Task graph, scheduler, merger, assembler and pipeline
//! - [`executor`] - Pluggable unit-of-work backends
//! - [`events`] - Progress and task completion events
//! - [`persistence`] - Prototype store boundary and in-memory store
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prototyper_core::{GenerationOptions, PrototypePipeline, PrototyperConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = PrototypePipeline::with_defaults(PrototyperConfig::default())?;
//! let dbml = "Table users {\n  id int [pk]\n  email varchar\n}\n";
//! let outcome = pipeline
//!     .generate(GenerationOptions::new(dbml, "Users"), &CancellationToken::new())
//!     .await?;
//! println!("{} components", outcome.artifact.configuration.components.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod executor;
pub mod logging;
pub mod mapping;
pub mod orchestration;
pub mod persistence;
pub mod schema;

pub use config::{ConfigLoader, DependencyFailurePolicy, PrototyperConfig, SchedulerConfig};
pub use error::{ExecutionError, ParseError, PipelineError, PrototyperError, Result, StoreError};
pub use events::{EventPublisher, PipelineEvent, RunProgress, RunStage};
#[cfg(any(test, feature = "test-util"))]
pub use executor::ScriptedExecutor;
pub use executor::{SimulatedSubagentExecutor, TaskExecutor};
pub use mapping::{generate_suggestions, ViewKind, ViewSuggestion};
pub use orchestration::{
    build_tasks, merge, GeneratedArtifact, GenerationOptions, GenerationPreferences,
    PipelineOutcome, PrototypePipeline, Task, TaskResult, TaskScheduler,
};
pub use persistence::{InMemoryPrototypeStore, PrototypeStore};
pub use schema::{parse, validate, ParsedSchema};
