//! Error types for the prototyper core.
//!
//! Local failures stay local: a failing generation task is captured as a
//! failed [`TaskResult`](crate::orchestration::TaskResult) and never surfaces
//! here. Everything in this module is fatal to the operation that raised it.

use crate::schema::ValidationIssue;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrototyperError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Schema validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationIssue>),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PrototyperError {
    fn from(error: serde_json::Error) -> Self {
        PrototyperError::Serialization(error.to_string())
    }
}

impl From<config::ConfigError> for PrototyperError {
    fn from(error: config::ConfigError) -> Self {
        PrototyperError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PrototyperError>;

/// Unrecoverable structural problem found while parsing DBML text.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected {found}, expected {expected}")]
    Unexpected { found: String, expected: &'static str },
    #[error("{block} block opened here is never closed")]
    UnterminatedBlock { block: &'static str },
    #[error("table declaration is missing a name")]
    MissingTableName,
    #[error("column '{column}' has no type")]
    MissingColumnType { column: String },
    #[error("malformed reference '{0}', expected table.column")]
    MalformedReference(String),
}

/// Failure of a single executor attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("permanent failure: {0}")]
    Permanent(String),
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("run was cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Failure outside task execution; aborts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("task graph is invalid: {0}")]
    InvalidTaskGraph(String),
    #[error("scheduler error: {0}")]
    Scheduler(String),
    #[error("assembly failed: {0}")]
    Assembly(String),
    #[error("run was cancelled during {stage}")]
    Cancelled { stage: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("item {0} not found")]
    NotFound(uuid::Uuid),
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
    #[error("store backend error: {0}")]
    Backend(String),
}
