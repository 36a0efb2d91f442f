//! # Prototype Pipeline
//!
//! Drives one generation run end to end: validate, parse, map, build tasks,
//! schedule, merge, assemble, store.
//!
//! Each run reports [`RunProgress`] events and per-task completions to the
//! callbacks given to [`PrototypePipeline::generate_with`], then mirrors them
//! onto the pipeline's [`EventPublisher`]. The callbacks see every event; the
//! broadcast feed is bounded and a slow subscriber may lag. Percent never
//! decreases, and the run ends with exactly one `complete` or `error` event. Per-task failures are recorded in the
//! result and never abort the run. A run can therefore complete with a
//! non-zero `stats.failed`.
//!
//! ```rust,no_run
//! use prototyper_core::config::PrototyperConfig;
//! use prototyper_core::orchestration::{GenerationOptions, PrototypePipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> prototyper_core::error::Result<()> {
//! let pipeline = PrototypePipeline::with_defaults(PrototyperConfig::default())?;
//! let options = GenerationOptions::new("Table users {\n  id int [pk]\n}\n", "Users");
//! let outcome = pipeline
//!     .generate_with(
//!         options,
//!         &CancellationToken::new(),
//!         |progress| println!("{}% {}", progress.percent, progress.message),
//!         |result| println!("{} settled, success={}", result.task_id, result.success),
//!     )
//!     .await?;
//! println!("stored prototype {}", outcome.stored.id);
//! # Ok(())
//! # }
//! ```

use super::prototype_assembler::{assemble, GeneratedArtifact};
use super::response_merger::merge;
use super::scheduler::TaskScheduler;
use super::task_graph::build_tasks;
use super::types::{GenerationOptions, TaskResult};
use crate::config::PrototyperConfig;
use crate::error::{PipelineError, PrototyperError, Result};
use crate::events::{EventPublisher, PipelineEvent, ProgressTracker, RunProgress, RunStage};
use crate::executor::{SimulatedSubagentExecutor, TaskExecutor};
use crate::logging::log_error;
use crate::mapping::{UiMapper, ViewSuggestion};
use crate::persistence::{InMemoryPrototypeStore, PrototypeStore, StoredPrototype};
use crate::schema::{parse, validate, Severity};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub stored: StoredPrototype,
    pub artifact: GeneratedArtifact,
    pub suggestions: Vec<ViewSuggestion>,
    pub results: Vec<TaskResult>,
    pub progress: Vec<RunProgress>,
}

impl PipelineOutcome {
    /// True when every generation task succeeded.
    pub fn is_complete(&self) -> bool {
        self.artifact.configuration.custom.stats.failed == 0
    }
}

pub struct PrototypePipeline {
    config: PrototyperConfig,
    executor: Arc<dyn TaskExecutor>,
    store: Arc<dyn PrototypeStore>,
    publisher: EventPublisher,
}

impl PrototypePipeline {
    pub fn new(
        config: PrototyperConfig,
        executor: Arc<dyn TaskExecutor>,
        store: Arc<dyn PrototypeStore>,
        publisher: EventPublisher,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            executor,
            store,
            publisher,
        })
    }

    /// Simulated executor, in-memory store and a publisher sized from config.
    pub fn with_defaults(config: PrototyperConfig) -> Result<Self> {
        let executor = Arc::new(SimulatedSubagentExecutor::new(&config.executor));
        let publisher = EventPublisher::from_config(&config.events);
        Self::new(
            config,
            executor,
            Arc::new(InMemoryPrototypeStore::new()),
            publisher,
        )
    }

    pub fn config(&self) -> &PrototyperConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn PrototypeStore> {
        &self.store
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.publisher.subscribe()
    }

    /// Run without callbacks. Events are still published on the broadcast
    /// feed returned by [`subscribe`](Self::subscribe).
    pub async fn generate(
        &self,
        options: GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        self.generate_with(options, cancel, |_| {}, |_| {}).await
    }

    /// Run with synchronous callbacks. `on_progress` receives every progress
    /// event in emission order, ending in exactly one `complete` or `error`.
    /// `on_task` is invoked exactly once per task as it settles. Both are
    /// called before the matching event is broadcast.
    #[instrument(skip_all, fields(name = %options.name))]
    pub async fn generate_with<P, T>(
        &self,
        options: GenerationOptions,
        cancel: &CancellationToken,
        mut on_progress: P,
        mut on_task: T,
    ) -> Result<PipelineOutcome>
    where
        P: FnMut(&RunProgress) + Send,
        T: FnMut(&TaskResult) + Send,
    {
        let mut progress = ProgressTracker::with_sink(self.publisher.clone(), &mut on_progress);
        match self
            .run_stages(&options, cancel, &mut progress, &mut on_task)
            .await
        {
            Ok(mut outcome) => {
                outcome.progress = progress.history().to_vec();
                Ok(outcome)
            }
            Err(error) => {
                log_error("pipeline", "generate", &error.to_string(), Some(&options.name));
                progress.fail(error.to_string());
                Err(error)
            }
        }
    }

    async fn run_stages(
        &self,
        options: &GenerationOptions,
        cancel: &CancellationToken,
        progress: &mut ProgressTracker<'_>,
        on_task: &mut (dyn FnMut(&TaskResult) + Send),
    ) -> Result<PipelineOutcome> {
        progress.enter(RunStage::Parsing, "Validating and parsing schema");
        let report = validate(&options.dbml_content);
        for warning in report.warnings() {
            warn!(line = warning.line, message = %warning.message, "Schema warning");
        }
        if !report.valid {
            return Err(PrototyperError::Validation(
                report
                    .errors
                    .into_iter()
                    .filter(|issue| issue.severity == Severity::Error)
                    .collect(),
            ));
        }
        let schema = parse(&options.dbml_content)?;
        ensure_active(cancel, RunStage::Parsing)?;

        progress.enter(
            RunStage::Mapping,
            format!("Mapping {} table(s) to views", schema.tables.len()),
        );
        let suggestions = UiMapper::new(&schema.tables, &schema.relationships)
            .with_enums(&schema.enums)
            .generate();

        progress.enter(
            RunStage::PromptCreation,
            format!("Creating tasks for {} view suggestion(s)", suggestions.len()),
        );
        let tasks = build_tasks(&suggestions, &options.preferences);
        ensure_active(cancel, RunStage::PromptCreation)?;

        let scheduler_config = options
            .subagent_config
            .as_ref()
            .map(|overrides| overrides.apply_to(&self.config.scheduler))
            .unwrap_or_else(|| self.config.scheduler.clone());
        let scheduler = TaskScheduler::new(Arc::clone(&self.executor), scheduler_config);

        progress.enter(
            RunStage::SubagentCoordination,
            format!("Running {} generation task(s)", tasks.len()),
        );
        let total = tasks.len();
        let mut settled = 0usize;
        let publisher = self.publisher.clone();
        let results = scheduler
            .run(&tasks, cancel, |result| {
                settled += 1;
                on_task(result);
                publisher.publish_task_completed(result.clone());
                progress.coordination(settled, total);
            })
            .await?;

        progress.enter(RunStage::ResponseValidation, "Validating generated output");
        let merged = merge(&results);
        if merged.stats.failed > 0 {
            warn!(
                failed = merged.stats.failed,
                total = merged.stats.total,
                "Some generation tasks failed"
            );
        }

        progress.enter(RunStage::PrototypeCreation, "Assembling prototype");
        let artifact = assemble(options, &schema, merged)?;
        ensure_active(cancel, RunStage::PrototypeCreation)?;
        let stored = self.store.create(artifact.clone().into()).await?;

        let stats = &artifact.configuration.custom.stats;
        info!(
            id = %stored.id,
            components = artifact.configuration.components.len(),
            successful = stats.successful,
            failed = stats.failed,
            "Prototype generated"
        );
        progress.complete(format!(
            "Generated {} component(s), {} task(s) failed",
            artifact.configuration.components.len(),
            stats.failed
        ));

        Ok(PipelineOutcome {
            stored,
            artifact,
            suggestions,
            results,
            progress: Vec::new(),
        })
    }
}

fn ensure_active(cancel: &CancellationToken, stage: RunStage) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled {
            stage: stage.to_string(),
        }
        .into());
    }
    Ok(())
}
