//! Event payloads emitted over the lifetime of a generation run.

use crate::orchestration::TaskResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Parsing,
    Mapping,
    PromptCreation,
    SubagentCoordination,
    ResponseValidation,
    PrototypeCreation,
    Complete,
    Error,
}

impl RunStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsing => "parsing",
            Self::Mapping => "mapping",
            Self::PromptCreation => "prompt_creation",
            Self::SubagentCoordination => "subagent_coordination",
            Self::ResponseValidation => "response_validation",
            Self::PrototypeCreation => "prototype_creation",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// One progress report. `percent` never decreases within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub stage: RunStage,
    pub percent: u8,
    pub message: String,
    pub error: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

impl RunProgress {
    pub fn new(stage: RunStage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            message: message.into(),
            error: None,
            emitted_at: Utc::now(),
        }
    }
}

/// Everything a listener can observe about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Progress(RunProgress),
    TaskCompleted(TaskResult),
}

impl PipelineEvent {
    pub fn as_progress(&self) -> Option<&RunProgress> {
        match self {
            Self::Progress(progress) => Some(progress),
            Self::TaskCompleted(_) => None,
        }
    }
}
