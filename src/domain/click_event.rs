//! Click events and the non-blocking recorder handlers use to emit them.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, warn};

/// One served redirect, queued for asynchronous counting.
///
/// Carries the record id so the worker can increment without a lookup; the
/// code is kept for logging only.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub link_id: i64,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

impl ClickEvent {
    pub fn new(link_id: i64, code: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            link_id,
            code: code.into(),
            occurred_at,
        }
    }
}

/// Fire-and-forget handle onto the bounded click queue.
///
/// [`ClickRecorder::record`] never waits: when the queue is full the click
/// is dropped and logged. Undercounting is accepted; delaying a redirect is
/// not.
#[derive(Debug, Clone)]
pub struct ClickRecorder {
    sender: mpsc::Sender<ClickEvent>,
}

impl ClickRecorder {
    pub fn new(sender: mpsc::Sender<ClickEvent>) -> Self {
        Self { sender }
    }

    /// Creates a recorder and the receiving end for the worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ClickEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Queues a click. Returns whether the event was accepted.
    pub fn record(&self, event: ClickEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                metrics::counter!("clicks_dropped_total").increment(1);
                warn!(
                    code = %event.code,
                    link_id = event.link_id,
                    "Click queue full, dropping click"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                metrics::counter!("clicks_dropped_total").increment(1);
                error!(
                    code = %event.code,
                    link_id = event.link_id,
                    "Click queue closed, dropping click"
                );
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Remaining free slots in the queue.
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_event_creation() {
        let now = Utc::now();
        let event = ClickEvent::new(42, "abc12345", now);

        assert_eq!(event.link_id, 42);
        assert_eq!(event.code, "abc12345");
        assert_eq!(event.occurred_at, now);
    }

    #[test]
    fn test_record_enqueues() {
        let (recorder, mut rx) = ClickRecorder::channel(4);

        assert!(recorder.record(ClickEvent::new(1, "a", Utc::now())));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.link_id, 1);
    }

    #[test]
    fn test_record_drops_when_full() {
        let (recorder, mut rx) = ClickRecorder::channel(1);

        assert!(recorder.record(ClickEvent::new(1, "a", Utc::now())));
        assert!(!recorder.record(ClickEvent::new(2, "b", Utc::now())));

        assert_eq!(rx.try_recv().unwrap().link_id, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_record_drops_when_closed() {
        let (recorder, rx) = ClickRecorder::channel(4);
        drop(rx);

        assert!(recorder.is_closed());
        assert!(!recorder.record(ClickEvent::new(1, "a", Utc::now())));
    }
}
