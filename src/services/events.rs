//! Event system for progress operations
//!
//! Services emit a [`ProgressEvent`] after each successful write. The daemon
//! subscribes a logging listener for an audit trail; other listeners can
//! subscribe to the same bus.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::db::models::MasteryLevel;

/// Progress events emitted by services
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    AssessmentRecorded {
        learner_id: String,
        topic_id: String,
        assessment_id: String,
        is_correct: Option<bool>,
    },
    ProgressUpdated {
        learner_id: String,
        topic_id: String,
        previous: MasteryLevel,
        current: MasteryLevel,
    },
    MasteryAchieved {
        learner_id: String,
        topic_id: String,
    },
    StudySessionRecorded {
        learner_id: String,
        session_id: String,
        duration_minutes: Option<u32>,
    },
    GoalCreated {
        learner_id: String,
        goal_id: String,
        target_count: usize,
    },
    TopicUpserted {
        topic_id: String,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Event bus for broadcasting progress events
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: ProgressEvent) {
        trace!(event = ?event, "Emitting progress event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::MasteryAchieved { learner_id, topic_id } => {
                info!(learner = %learner_id, topic = %topic_id, "Mastery achieved");
            }
            ProgressEvent::AssessmentRecorded {
                learner_id,
                topic_id,
                is_correct,
                ..
            } => {
                debug!(learner = %learner_id, topic = %topic_id, correct = ?is_correct, "Assessment recorded");
            }
            ProgressEvent::ProgressUpdated {
                learner_id,
                topic_id,
                previous,
                current,
            } if previous != current => {
                debug!(
                    learner = %learner_id,
                    topic = %topic_id,
                    from = previous.as_str(),
                    to = current.as_str(),
                    "Mastery level changed"
                );
            }
            ProgressEvent::StudySessionRecorded {
                learner_id,
                duration_minutes,
                ..
            } => {
                debug!(learner = %learner_id, minutes = ?duration_minutes, "Study session recorded");
            }
            _ => {
                trace!(event = ?event, "Progress event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(ProgressEvent::MasteryAchieved {
            learner_id: "learner-1".into(),
            topic_id: "algebra".into(),
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");

        match event {
            ProgressEvent::MasteryAchieved { learner_id, topic_id } => {
                assert_eq!(learner_id, "learner-1");
                assert_eq!(topic_id, "algebra");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(ProgressEvent::TopicUpserted { topic_id: "t".into() });
    }
}
