//! Ordered progress emission for a single run.

use super::publisher::EventPublisher;
use super::types::{RunProgress, RunStage};
use crate::constants::{stage_percent, COORDINATION_PERCENT_SPAN};
use crate::logging::log_pipeline_stage;
use std::fmt;

/// Synchronous progress callback. Sees every event, in order.
pub type ProgressSink<'a> = &'a mut (dyn FnMut(&RunProgress) + Send + 'a);

/// Emits [`RunProgress`] events for one run.
///
/// Percent is clamped so it never decreases, and exactly one terminal event
/// (`complete` or `error`) is emitted; anything reported after it is dropped.
/// Each event goes to the sink first, then to the broadcast feed.
pub struct ProgressTracker<'a> {
    publisher: EventPublisher,
    sink: Option<ProgressSink<'a>>,
    percent: u8,
    finished: bool,
    history: Vec<RunProgress>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(publisher: EventPublisher) -> Self {
        Self {
            publisher,
            sink: None,
            percent: 0,
            finished: false,
            history: Vec::new(),
        }
    }

    pub fn with_sink(publisher: EventPublisher, sink: ProgressSink<'a>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(publisher)
        }
    }

    /// Report entry into `stage` at its fixed percentage.
    pub fn enter(&mut self, stage: RunStage, message: impl Into<String>) {
        self.report(stage, stage_percent(stage), message.into(), None);
    }

    /// Report task completion counts inside the coordination span.
    pub fn coordination(&mut self, settled: usize, total: usize) {
        let base = stage_percent(RunStage::SubagentCoordination);
        let span = u32::from(COORDINATION_PERCENT_SPAN);
        let offset = if total == 0 {
            span
        } else {
            span * settled.min(total) as u32 / total as u32
        };
        let percent = base.saturating_add(offset as u8);
        self.report(
            RunStage::SubagentCoordination,
            percent,
            format!("{settled}/{total} generation tasks settled"),
            None,
        );
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        self.report(RunStage::Complete, 100, message.into(), None);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.report(
            RunStage::Error,
            self.percent,
            format!("Generation failed: {error}"),
            Some(error),
        );
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Every event emitted so far, in order.
    pub fn history(&self) -> &[RunProgress] {
        &self.history
    }

    fn report(&mut self, stage: RunStage, percent: u8, message: String, error: Option<String>) {
        if self.finished {
            return;
        }
        self.percent = self.percent.max(percent.min(100));
        self.finished = stage.is_terminal();

        log_pipeline_stage(stage, self.percent, &message);
        let mut progress = RunProgress::new(stage, self.percent, message);
        progress.error = error;
        if let Some(sink) = self.sink.as_mut() {
            sink(&progress);
        }
        self.history.push(progress.clone());
        self.publisher.publish_progress(progress);
    }
}

impl fmt::Debug for ProgressTracker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("percent", &self.percent)
            .field("finished", &self.finished)
            .field("events", &self.history.len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
