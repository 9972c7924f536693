use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::QueryEvent;

/// Envelope wrapping a query event with its emission time
#[derive(Debug, Clone)]
pub struct QueryEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: QueryEvent,
}

/// Handle for emitting query events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through an async channel to be written by the
/// HistoryWriter. Emission is fire-and-forget: a full or closed channel
/// drops the event with an error log, it never blocks or fails the
/// emitting task.
#[derive(Clone)]
pub struct QueryEventHandle {
    tx: mpsc::Sender<QueryEventEnvelope>,
}

impl QueryEventHandle {
    /// Create a new handle from a channel sender
    pub fn new(tx: mpsc::Sender<QueryEventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit a query event without blocking
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: QueryEvent) -> bool {
        let envelope = QueryEventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit query event: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchCriteria;

    fn event(indexer_id: i32) -> QueryEvent {
        QueryEvent {
            indexer_id,
            indexer: format!("indexer-{indexer_id}"),
            criteria: SearchCriteria::basic("stargate"),
            telemetry: None,
        }
    }

    #[test]
    fn test_try_emit_event() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = QueryEventHandle::new(tx);

        assert!(handle.try_emit(event(1)));

        let envelope = rx.try_recv().expect("Should receive event");
        assert_eq!(envelope.event.indexer_id, 1);
    }

    #[test]
    fn test_multiple_handles_same_channel() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle1 = QueryEventHandle::new(tx.clone());
        let handle2 = QueryEventHandle::new(tx);

        assert!(handle1.try_emit(event(1)));
        assert!(handle2.try_emit(event(2)));

        let e1 = rx.try_recv().expect("Should receive first event");
        let e2 = rx.try_recv().expect("Should receive second event");

        assert_eq!(e1.event.indexer_id, 1);
        assert_eq!(e2.event.indexer_id, 2);
    }

    #[test]
    fn test_try_emit_full_channel() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = QueryEventHandle::new(tx);

        // First should succeed
        assert!(handle.try_emit(event(1)));

        // Second should fail (channel full)
        assert!(!handle.try_emit(event(2)));
    }

    #[test]
    fn test_try_emit_closed_channel() {
        let (tx, rx) = mpsc::channel::<QueryEventEnvelope>(10);
        let handle = QueryEventHandle::new(tx);

        // Drop the receiver to close the channel
        drop(rx);

        // This should not panic, just log an error
        assert!(!handle.try_emit(event(1)));
    }

    #[test]
    fn test_envelope_has_timestamp() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = QueryEventHandle::new(tx);

        let before = Utc::now();
        handle.try_emit(event(1));
        let after = Utc::now();

        let envelope = rx.try_recv().expect("Should receive event");
        assert!(envelope.timestamp >= before);
        assert!(envelope.timestamp <= after);
    }
}
