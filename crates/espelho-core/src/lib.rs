//! espelho-core - Core library for Espelho
//!
//! The offline mirror and synchronization engine: local schema for mirrored
//! server entities, the durable mutation log recording edits made while
//! offline, the network-triggered sync loop, and the snapshot-replace pull
//! path. Presentation, sign-in, and platform connectivity are external
//! collaborators.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod net;
pub mod sync;
mod util;

pub use config::SyncConfig;
pub use db::{LocalStore, Mirrored, QueryFacade, TableCounts, TableSync, TaskDetail};
pub use error::{Error, Result};
pub use models::{
    Attachment, Category, Comment, EntityKind, OpType, PendingOperation, Record, Task, User,
    Workspace,
};
pub use net::{drive_sync, NetworkMonitor, Transport};
pub use sync::{
    EventBus, HttpRemote, Remote, Snapshot, SnapshotApplier, SnapshotStats, SyncCoordinator,
    SyncEvent, SyncOutcome, SyncState, SyncStatus,
};
