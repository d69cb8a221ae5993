//! Typed sync/linking events delivered to registered observers.
//!
//! The UI layer subscribes to show per-entity spinners and the re-link
//! banner; events replace ad-hoc broadcast notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Every externally visible state change produces an Event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A sync attempt entered the Syncing state.
    SyncStarted {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    /// A sync attempt finished, successfully or not.
    SyncFinished {
        session_id: Uuid,
        success: bool,
        at: DateTime<Utc>,
    },
    /// The linking state machine changed state.
    LinkingStatusChanged {
        is_linked: bool,
        email: Option<String>,
        at: DateTime<Utc>,
    },
}

/// Fan-out bus for [`Event`]s.
///
/// Subscribers receive every event emitted after they subscribed; closed
/// receivers are pruned on the next emit.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Event>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Deliver an event to all live subscribers.
    pub fn emit(&self, event: Event) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_to_all_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(Event::SyncStarted {
            session_id: Uuid::new_v4(),
            at: Utc::now(),
        });

        assert!(matches!(rx1.try_recv(), Ok(Event::SyncStarted { .. })));
        assert!(matches!(rx2.try_recv(), Ok(Event::SyncStarted { .. })));
    }

    #[test]
    fn prunes_dropped_subscribers() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);

        bus.emit(Event::SyncFinished {
            session_id: Uuid::new_v4(),
            success: true,
            at: Utc::now(),
        });
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::LinkingStatusChanged {
            is_linked: true,
            email: Some("user@example.com".to_string()),
            at: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "LinkingStatusChanged");
        assert_eq!(value["is_linked"], true);
    }
}
