//! Session lifecycle events
//!
//! The client never navigates anywhere itself. When the session starts,
//! renews or ends it broadcasts a `SessionEvent`; the surrounding
//! application decides what "go back to login" means for it.

use tokio::sync::broadcast;

/// Capacity of the session event channel. Slow subscribers lag and miss
/// older events rather than blocking the request path.
pub const SESSION_EVENT_CAPACITY: usize = 16;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCause {
    /// Explicit logout.
    LoggedOut,
    /// The refresh endpoint refused to issue a new access credential.
    RefreshFailed(String),
}

/// Session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login succeeded and an access credential was stored.
    Established,
    /// The access credential was replaced after a refresh.
    Renewed,
    /// The access credential was cleared.
    Terminated { cause: TerminationCause },
}

impl SessionEvent {
    pub fn label(&self) -> &'static str {
        match self {
            SessionEvent::Established => "established",
            SessionEvent::Renewed => "renewed",
            SessionEvent::Terminated { .. } => "terminated",
        }
    }
}

/// Sending half of the session event channel.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is normal.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();

        events.emit(SessionEvent::Established);
        events.emit(SessionEvent::Terminated {
            cause: TerminationCause::LoggedOut,
        });

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Established);
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Terminated {
                cause: TerminationCause::LoggedOut
            }
        );
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        SessionEvents::new().emit(SessionEvent::Renewed);
    }

    #[test]
    fn labels() {
        assert_eq!(SessionEvent::Renewed.label(), "renewed");
        assert_eq!(
            SessionEvent::Terminated {
                cause: TerminationCause::RefreshFailed("expired".into())
            }
            .label(),
            "terminated"
        );
    }
}
