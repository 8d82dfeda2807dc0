//! Connectivity observation and the debounced sync trigger
//!
//! The platform connectivity collaborator feeds transitions into
//! [`NetworkMonitor::report`]; [`drive_sync`] debounces them so each
//! offline→online transition triggers at most one sync attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::sync::{EventBus, Remote, SyncCoordinator, SyncEvent};

/// Transport class of the current link.
///
/// Callers can prefer unmetered connections for large pulls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    #[default]
    None,
    Cellular,
    Wifi,
}

impl Transport {
    pub const fn is_connected(self) -> bool {
        !matches!(self, Self::None)
    }

    pub const fn is_wifi(self) -> bool {
        matches!(self, Self::Wifi)
    }
}

/// Observes connectivity transitions and exposes point-in-time queries
#[derive(Debug)]
pub struct NetworkMonitor {
    tx: watch::Sender<Transport>,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Transport::None);
        Self { tx }
    }

    /// Record a transport transition; repeated reports of the same state
    /// are ignored
    pub fn report(&self, transport: Transport) {
        self.tx.send_if_modified(|current| {
            if *current == transport {
                false
            } else {
                tracing::debug!(from = ?*current, to = ?transport, "connectivity changed");
                *current = transport;
                true
            }
        });
    }

    pub fn is_connected(&self) -> bool {
        self.tx.borrow().is_connected()
    }

    pub fn is_wifi_connected(&self) -> bool {
        self.tx.borrow().is_wifi()
    }

    /// Subscribe to availability transitions
    pub fn watch(&self) -> watch::Receiver<Transport> {
        self.tx.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive the coordinator off connectivity transitions until the monitor is
/// dropped.
///
/// On offline→online the loop waits out the debounce window, re-checks the
/// link, and fires at most one trigger; flaps inside the window collapse.
/// Wifi transitions are surfaced on the coordinator's event stream.
pub async fn drive_sync<R: Remote>(
    monitor: &NetworkMonitor,
    coordinator: Arc<SyncCoordinator<R>>,
    debounce: Duration,
) {
    let mut rx = monitor.watch();
    let mut last = *rx.borrow();

    loop {
        if rx.changed().await.is_err() {
            break;
        }
        let current = *rx.borrow_and_update();
        if current == last {
            continue;
        }
        emit_wifi_events(coordinator.events(), last, current);
        let became_available = current.is_connected() && !last.is_connected();
        last = current;
        if !became_available {
            continue;
        }

        tokio::time::sleep(debounce).await;
        let settled = *rx.borrow_and_update();
        if settled != last {
            emit_wifi_events(coordinator.events(), last, settled);
            last = settled;
        }
        if settled.is_connected() {
            coordinator.trigger().await;
        }
    }
}

fn emit_wifi_events(events: &EventBus, from: Transport, to: Transport) {
    if to.is_wifi() && !from.is_wifi() {
        events.emit(SyncEvent::WifiConnected);
    }
    if !to.is_wifi() && from.is_wifi() {
        events.emit(SyncEvent::WifiDisconnected);
    }
}
