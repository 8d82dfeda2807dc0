//! Sync coordinator: drains the mutation log as one ordered batch
//!
//! Single-flight: at most one cycle runs at a time; a trigger observed while
//! Syncing is dropped, not queued, relying on the next connectivity event or
//! manual call to pick up newly queued work. An in-flight upload is never
//! cancelled by a new trigger.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SyncConfig;
use crate::db::{LocalStore, TableSync};
use crate::error::Result;
use crate::util::unix_millis_now;

use super::{EventBus, Remote, Snapshot, SnapshotApplier, SnapshotStats, SyncEvent};

/// Coordinator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
    /// Transient: returns to Syncing on the next trigger
    Failed,
}

/// Result of one trigger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Cycle ran; `uploaded` is 0 when the log was already empty
    Synced { uploaded: usize },
    /// Another cycle was in flight; this trigger was dropped
    Skipped,
    Failed { message: String },
}

/// Point-in-time report for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: SyncState,
    pub pending_operations: u64,
    pub tables: Vec<TableSync>,
}

/// Orchestrates one sync cycle: drain log → batch upload → purge on success;
/// also drives snapshot pulls.
pub struct SyncCoordinator<R> {
    store: Arc<LocalStore>,
    remote: R,
    config: SyncConfig,
    events: EventBus,
    in_flight: AtomicBool,
    state: Mutex<SyncState>,
}

impl<R: Remote> SyncCoordinator<R> {
    pub fn new(store: Arc<LocalStore>, remote: R, config: SyncConfig, events: EventBus) -> Self {
        Self {
            store,
            remote,
            config,
            events,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Run one sync cycle unless another is already in flight.
    ///
    /// Guarded by a compare-and-swap owned by this instance; concurrent
    /// triggers return [`SyncOutcome::Skipped`].
    pub async fn trigger(&self) -> SyncOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sync already in flight, trigger dropped");
            return SyncOutcome::Skipped;
        }
        let _flight = FlightGuard(&self.in_flight);

        self.set_state(SyncState::Syncing);
        self.events.emit(SyncEvent::SyncStart);

        match self.run_cycle().await {
            Ok(uploaded) => {
                self.set_state(SyncState::Idle);
                self.events.emit(SyncEvent::SyncSuccess { uploaded });
                SyncOutcome::Synced { uploaded }
            }
            Err(error) => {
                let message = error.to_string();
                tracing::warn!(%message, "sync cycle failed");
                self.set_state(SyncState::Failed);
                self.events.emit(SyncEvent::SyncError {
                    message: message.clone(),
                });
                SyncOutcome::Failed { message }
            }
        }
    }

    async fn run_cycle(&self) -> Result<usize> {
        let batch = self.store.pending_operations()?;
        if batch.is_empty() {
            tracing::debug!("nothing to sync");
            return Ok(0);
        }

        tracing::info!(operations = batch.len(), "uploading batch");
        match self.remote.push_batch(&batch).await {
            Ok(()) => {
                // each removal is independent and idempotent: an interrupted
                // purge leaves ops to be resent, and the server deduplicates
                // by op_id
                for op in &batch {
                    self.store.remove_operation(&op.op_id)?;
                }

                let tables: Vec<&str> = batch
                    .iter()
                    .map(|op| op.entity.table())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                self.store.mark_tables_synced(&tables, unix_millis_now())?;
                Ok(batch.len())
            }
            Err(error) => {
                let op_ids: Vec<String> = batch.iter().map(|op| op.op_id.clone()).collect();
                if let Err(bump) = self.store.bump_retry(&op_ids) {
                    tracing::warn!(error = %bump, "failed to record retry attempt");
                }
                Err(error)
            }
        }
    }

    /// Fetch and apply a full snapshot for the configured user.
    ///
    /// Explicitly triggered; never runs off a connectivity event.
    pub async fn pull_snapshot(&self) -> Result<SnapshotStats> {
        let snapshot = self.remote.fetch_snapshot(&self.config.user_email).await?;
        self.apply_snapshot(&snapshot)
    }

    /// Apply a caller-supplied snapshot payload
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> Result<SnapshotStats> {
        SnapshotApplier::new(&self.store).apply(snapshot)
    }

    pub fn status(&self) -> Result<SyncStatus> {
        Ok(SyncStatus {
            state: self.state(),
            pending_operations: self.store.pending_count()?,
            tables: self.store.sync_status()?,
        })
    }
}

/// Releases the single-flight flag even if a cycle panics
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{EntityKind, OpType, PendingOperation, Task};
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::{Notify, Semaphore};

    struct MockInner {
        calls: AtomicUsize,
        fail: AtomicBool,
        block: AtomicBool,
        entered: Notify,
        release: Semaphore,
        batches: Mutex<Vec<Vec<PendingOperation>>>,
        snapshot: Mutex<Snapshot>,
    }

    impl Default for MockInner {
        fn default() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                block: AtomicBool::new(false),
                entered: Notify::new(),
                release: Semaphore::new(0),
                batches: Mutex::new(Vec::new()),
                snapshot: Mutex::new(Snapshot::default()),
            }
        }
    }

    #[derive(Clone, Default)]
    struct MockRemote {
        inner: Arc<MockInner>,
    }

    impl MockRemote {
        fn calls(&self) -> usize {
            self.inner.calls.load(Ordering::SeqCst)
        }
    }

    impl Remote for MockRemote {
        fn push_batch(
            &self,
            batch: &[PendingOperation],
        ) -> impl Future<Output = Result<()>> + Send {
            let inner = Arc::clone(&self.inner);
            let batch = batch.to_vec();
            async move {
                inner.calls.fetch_add(1, Ordering::SeqCst);
                inner
                    .batches
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(batch);
                inner.entered.notify_one();
                if inner.block.load(Ordering::SeqCst) {
                    let permit = inner.release.acquire().await.unwrap();
                    permit.forget();
                }
                if inner.fail.load(Ordering::SeqCst) {
                    Err(Error::Transport("server unavailable".into()))
                } else {
                    Ok(())
                }
            }
        }

        fn fetch_snapshot(
            &self,
            _user_email: &str,
        ) -> impl Future<Output = Result<Snapshot>> + Send {
            let inner = Arc::clone(&self.inner);
            async move {
                Ok(inner
                    .snapshot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone())
            }
        }
    }

    fn coordinator(remote: MockRemote) -> Arc<SyncCoordinator<MockRemote>> {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let config = SyncConfig::new("https://api.example.com", "a@b.c").unwrap();
        Arc::new(SyncCoordinator::new(
            store,
            remote,
            config,
            EventBus::default(),
        ))
    }

    #[tokio::test]
    async fn successful_cycle_purges_log_and_keeps_record() {
        let remote = MockRemote::default();
        let coordinator = coordinator(remote.clone());
        let mut events = coordinator.events().subscribe();

        let task_id = coordinator.store().create(Task::new("Buy milk", 1)).unwrap();
        let outcome = coordinator.trigger().await;

        assert_eq!(outcome, SyncOutcome::Synced { uploaded: 1 });
        assert_eq!(coordinator.state(), SyncState::Idle);
        assert_eq!(coordinator.store().pending_count().unwrap(), 0);
        // the record itself survives the purge
        let record = coordinator
            .store()
            .with_conn(|conn| {
                crate::db::store::read_record(conn, EntityKind::Task, task_id)
            })
            .unwrap();
        assert!(record.is_some());

        assert_eq!(events.recv().await.unwrap(), SyncEvent::SyncStart);
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::SyncSuccess { uploaded: 1 }
        );
    }

    #[tokio::test]
    async fn failed_cycle_retains_ops_in_order() {
        let remote = MockRemote::default();
        remote.inner.fail.store(true, Ordering::SeqCst);
        let coordinator = coordinator(remote.clone());
        let mut events = coordinator.events().subscribe();

        let id = coordinator.store().create(Task::new("Offline", 1)).unwrap();
        let mut task = Task::new("Offline, edited", 1);
        task.id = Some(id);
        coordinator.store().update(task).unwrap();

        let outcome = coordinator.trigger().await;
        assert!(matches!(outcome, SyncOutcome::Failed { .. }));
        assert_eq!(coordinator.state(), SyncState::Failed);

        let pending = coordinator.store().pending_operations().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].op_type, OpType::Create);
        assert_eq!(pending[1].op_type, OpType::Update);
        assert_eq!(pending[0].retry_count, 1);
        assert_eq!(pending[1].retry_count, 1);

        assert_eq!(events.recv().await.unwrap(), SyncEvent::SyncStart);
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::SyncError { .. }
        ));

        // Failed is transient: the next trigger drains the same batch
        remote.inner.fail.store(false, Ordering::SeqCst);
        let outcome = coordinator.trigger().await;
        assert_eq!(outcome, SyncOutcome::Synced { uploaded: 2 });
        assert_eq!(coordinator.store().pending_count().unwrap(), 0);
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn empty_log_syncs_without_network_call() {
        let remote = MockRemote::default();
        let coordinator = coordinator(remote.clone());

        let outcome = coordinator.trigger().await;
        assert_eq!(outcome, SyncOutcome::Synced { uploaded: 0 });
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_trigger_is_dropped() {
        let remote = MockRemote::default();
        remote.inner.block.store(true, Ordering::SeqCst);
        let coordinator = coordinator(remote.clone());
        coordinator.store().create(Task::new("One", 1)).unwrap();

        let background = Arc::clone(&coordinator);
        let handle = tokio::spawn(async move { background.trigger().await });
        // wait until the first cycle is inside the network call
        remote.inner.entered.notified().await;

        let outcome = coordinator.trigger().await;
        assert_eq!(outcome, SyncOutcome::Skipped);

        remote.inner.release.add_permits(1);
        let first = handle.await.unwrap();
        assert_eq!(first, SyncOutcome::Synced { uploaded: 1 });
        // exactly one network batch despite two triggers
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn batch_is_sent_in_client_ts_order() {
        let remote = MockRemote::default();
        let coordinator = coordinator(remote.clone());
        coordinator.store().create(Task::new("First", 1)).unwrap();
        coordinator.store().create(Task::new("Second", 1)).unwrap();

        coordinator.trigger().await;

        let batches = remote
            .inner
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0][0].client_ts < batches[0][1].client_ts);
    }

    #[tokio::test]
    async fn pull_snapshot_applies_fetched_payload() {
        let remote = MockRemote::default();
        *remote
            .inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = serde_json::from_value(serde_json::json!({
            "user_email": "a@b.c",
            "workspaces": [{"id_workspace": 1, "nome": "W", "criador": "a@b.c"}],
            "tarefas": [{"id_tarefa": 4, "titulo": "From server", "id_usuario": 1,
                         "id_workspace": 1}]
        }))
        .unwrap();
        let coordinator = coordinator(remote);

        let stats = coordinator.pull_snapshot().await.unwrap();
        assert_eq!(stats.tasks, 1);
        assert_eq!(stats.workspaces, 1);

        let status = coordinator.status().unwrap();
        assert_eq!(status.state, SyncState::Idle);
        assert_eq!(status.pending_operations, 0);
        assert!(status.tables.iter().all(|t| t.last_sync.is_some()));
    }
}
