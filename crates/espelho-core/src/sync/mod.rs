//! Synchronization engine: push queue drain, snapshot pull, event stream

mod client;
mod coordinator;
mod events;
mod snapshot;

pub use client::{HttpRemote, Remote};
pub use coordinator::{SyncCoordinator, SyncOutcome, SyncState, SyncStatus};
pub use events::{EventBus, SyncEvent};
pub use snapshot::{Snapshot, SnapshotApplier, SnapshotStats};
