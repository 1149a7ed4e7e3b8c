//! Session events broadcast to observers.
//!
//! Events describe state changes after they happen; observers re-read the
//! [`SessionSnapshot`](crate::state::SessionSnapshot) for the full picture.
//! Call [`SessionEvents::subscribe`] to receive them.

use serde::Serialize;
use tokio::sync::broadcast;
use vmodel_core::types::ItemId;

use crate::state::Mode;

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A state change in the active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A generate or edit call was started.
    SubmissionStarted { operation_id: u64, mode: Mode },

    /// The call finished and its image was added to history.
    SubmissionCompleted { operation_id: u64, item_id: ItemId },

    /// The call settled after being stopped; its result was dropped.
    SubmissionDiscarded { operation_id: u64 },

    /// The call failed.
    SubmissionFailed { operation_id: u64, error: String },

    /// The in-flight operation was stopped by the user.
    SubmissionStopped { operation_id: u64 },

    /// History content or cursor changed.
    HistoryChanged { cursor: Option<usize>, len: usize },

    /// Prompt draft or an asset bag changed.
    DraftChanged,

    /// An error became visible.
    ErrorRaised { message: String },

    /// The visible error was dismissed (explicitly or by timeout).
    ErrorCleared,

    /// The session went back to an empty new-model state.
    SessionReset,
}

/// Fan-out publisher for [`SessionEvent`]s.
///
/// Cheap to clone; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create a publisher with a specific channel capacity.
    ///
    /// Slow receivers that fall behind observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: SessionEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();

        events.publish(SessionEvent::HistoryChanged {
            cursor: Some(0),
            len: 1,
        });

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(
            received,
            SessionEvent::HistoryChanged {
                cursor: Some(0),
                len: 1
            }
        );
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        SessionEvents::default().publish(SessionEvent::SessionReset);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(SessionEvent::SubmissionStarted {
            operation_id: 3,
            mode: Mode::NewModel,
        })
        .unwrap();
        assert_eq!(json["type"], "submission_started");
        assert_eq!(json["operation_id"], 3);
        assert_eq!(json["mode"], "NEW_MODEL");
    }
}
