use super::types::{PipelineEvent, RunProgress};
use crate::config::EventConfig;
use crate::orchestration::TaskResult;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast publisher for pipeline events.
///
/// Listeners subscribe before a run starts; events sent while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(config: &EventConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    /// Publish an event, returning how many subscribers received it.
    pub fn publish(&self, event: PipelineEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!(?event, "No subscribers for pipeline event");
                0
            }
        }
    }

    pub fn publish_progress(&self, progress: RunProgress) -> usize {
        self.publish(PipelineEvent::Progress(progress))
    }

    pub fn publish_task_completed(&self, result: TaskResult) -> usize {
        self.publish(PipelineEvent::TaskCompleted(result))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::from_config(&EventConfig::default())
    }
}
