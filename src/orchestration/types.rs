//! # Orchestration Types
//!
//! Generation tasks, their results, the run options a caller supplies, and the
//! output shapes the merger accepts from an executor.

use crate::config::SchedulerConfig;
use crate::mapping::ViewKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ViewGeneration,
    IntegrationSetup,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ViewGeneration => write!(f, "view_generation"),
            Self::IntegrationSetup => write!(f, "integration_setup"),
        }
    }
}

/// What a task's output must look like to be accepted by the merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    /// `component` for view tasks, `integration` for the aggregate task.
    pub format: String,
    pub component_name: Option<String>,
    pub required_fields: Vec<String>,
}

/// One unit of generation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub prompt: String,
    pub context: serde_json::Value,
    pub expected_output: ExpectedOutput,
    /// Higher runs first among simultaneously ready tasks.
    pub priority: i32,
    pub dependencies: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub processing_time_ms: u64,
    pub confidence: Option<f64>,
    /// Executor calls made, zero for a skipped task.
    pub attempts: u32,
}

/// Outcome of one task. Exactly one is produced per task per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub kind: TaskKind,
    pub success: bool,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub metadata: TaskMetadata,
}

impl TaskResult {
    pub fn succeeded(task: &Task, output: serde_json::Value, metadata: TaskMetadata) -> Self {
        Self {
            task_id: task.id.clone(),
            kind: task.kind,
            success: true,
            output: Some(output),
            error: None,
            metadata,
        }
    }

    pub fn failed(task: &Task, error: impl Into<String>, metadata: TaskMetadata) -> Self {
        Self {
            task_id: task.id.clone(),
            kind: task.kind,
            success: false,
            output: None,
            error: Some(error.into()),
            metadata,
        }
    }

    /// Result for a task never handed to the executor.
    pub fn skipped(task: &Task, failed_dependency: &str) -> Self {
        Self::failed(
            task,
            format!("skipped: dependency {failed_dependency} did not complete"),
            TaskMetadata {
                processing_time_ms: 0,
                confidence: None,
                attempts: 0,
            },
        )
    }

    pub fn is_skipped(&self) -> bool {
        self.metadata.attempts == 0 && !self.success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationPreferences {
    /// Restricts generated views; `None` keeps every suggested view.
    pub include_views: Option<Vec<ViewKind>>,
    pub theme_mode: ThemeMode,
    pub component_style: String,
    pub include_validation: bool,
    pub include_relationships: bool,
    pub generate_tests: bool,
}

impl Default for GenerationPreferences {
    fn default() -> Self {
        Self {
            include_views: None,
            theme_mode: ThemeMode::default(),
            component_style: "modern".to_string(),
            include_validation: true,
            include_relationships: true,
            generate_tests: false,
        }
    }
}

impl GenerationPreferences {
    pub fn includes(&self, kind: ViewKind) -> bool {
        self.include_views
            .as_ref()
            .map_or(true, |views| views.contains(&kind))
    }
}

/// Per-run overrides of the scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubagentConfig {
    pub max_concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
}

impl SubagentConfig {
    pub fn apply_to(&self, base: &SchedulerConfig) -> SchedulerConfig {
        let mut config = base.clone();
        if let Some(max_concurrency) = self.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(retry_attempts) = self.retry_attempts {
            config.retry_attempts = retry_attempts;
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub dbml_content: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub preferences: GenerationPreferences,
    #[serde(default)]
    pub subagent_config: Option<SubagentConfig>,
}

impl GenerationOptions {
    pub fn new(dbml_content: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dbml_content: dbml_content.into(),
            name: name.into(),
            description: None,
            preferences: GenerationPreferences::default(),
            subagent_config: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_preferences(mut self, preferences: GenerationPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_subagent_config(mut self, subagent_config: SubagentConfig) -> Self {
        self.subagent_config = Some(subagent_config);
        self
    }
}

/// Accepted output of a `view_generation` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedComponent {
    pub name: String,
    pub table: String,
    pub view_kind: ViewKind,
    pub code: String,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub tests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    pub component: String,
}

/// Accepted output of the `integration_setup` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationBundle {
    pub routes: Vec<RouteEntry>,
    pub navigation: Vec<String>,
    pub code: String,
}
