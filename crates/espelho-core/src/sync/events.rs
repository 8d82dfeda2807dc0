//! Sync event stream consumed by the presentation layer
//!
//! A sync cycle runs detached from any single caller, so its outcome is
//! observable only through these events.

use tokio::sync::broadcast;

/// Events emitted by the sync engine and the network monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SyncStart,
    SyncSuccess { uploaded: usize },
    SyncError { message: String },
    WifiConnected,
    WifiDisconnected,
}

/// Broadcast fan-out for [`SyncEvent`]s.
///
/// Emission never blocks; events sent with no subscribers are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        tracing::debug!(?event, "sync event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(SyncEvent::SyncStart);
        bus.emit(SyncEvent::SyncSuccess { uploaded: 3 });

        assert_eq!(rx.recv().await.unwrap(), SyncEvent::SyncStart);
        assert_eq!(
            rx.recv().await.unwrap(),
            SyncEvent::SyncSuccess { uploaded: 3 }
        );
    }

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let bus = EventBus::default();
        bus.emit(SyncEvent::WifiConnected);
    }
}
