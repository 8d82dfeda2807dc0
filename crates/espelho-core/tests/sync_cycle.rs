//! End-to-end offline cycle: queue edits while disconnected, reconnect,
//! drain the log, pull a snapshot.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use espelho_core::{
    drive_sync, Comment, EntityKind, Error, EventBus, LocalStore, NetworkMonitor, OpType,
    PendingOperation, QueryFacade, Remote, Result, Snapshot, SyncConfig, SyncCoordinator,
    SyncOutcome, Task, Transport,
};

#[derive(Default)]
struct ServerInner {
    pushes: AtomicUsize,
    reject: AtomicBool,
    accepted: Mutex<Vec<PendingOperation>>,
    snapshot: Mutex<Snapshot>,
}

/// In-memory stand-in for the sync endpoint; deduplicates by op_id the way
/// the real server must
#[derive(Clone, Default)]
struct FakeServer {
    inner: Arc<ServerInner>,
}

impl FakeServer {
    fn accepted(&self) -> Vec<PendingOperation> {
        self.inner
            .accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Remote for FakeServer {
    fn push_batch(&self, batch: &[PendingOperation]) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);
        let batch = batch.to_vec();
        async move {
            inner.pushes.fetch_add(1, Ordering::SeqCst);
            if inner.reject.load(Ordering::SeqCst) {
                return Err(Error::Transport("HTTP 503".into()));
            }
            let mut accepted = inner.accepted.lock().unwrap_or_else(PoisonError::into_inner);
            for op in batch {
                if !accepted.iter().any(|seen| seen.op_id == op.op_id) {
                    accepted.push(op);
                }
            }
            Ok(())
        }
    }

    fn fetch_snapshot(&self, _user_email: &str) -> impl Future<Output = Result<Snapshot>> + Send {
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

fn build(server: FakeServer) -> (Arc<LocalStore>, Arc<SyncCoordinator<FakeServer>>) {
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    let config = SyncConfig::new("https://api.example.com", "ana@example.com")
        .unwrap()
        .with_debounce(Duration::from_secs(2));
    let coordinator = Arc::new(SyncCoordinator::new(
        Arc::clone(&store),
        server,
        config,
        EventBus::default(),
    ));
    (store, coordinator)
}

#[tokio::test]
async fn offline_edits_survive_failure_and_drain_on_retry() {
    let server = FakeServer::default();
    let (store, coordinator) = build(server.clone());

    // edits made while disconnected
    let task_id = store.create(Task::new("Buy milk", 1)).unwrap();
    let mut edited = Task::new("Buy milk and bread", 1);
    edited.id = Some(task_id);
    store.update(edited).unwrap();
    store
        .create(Comment::new("ana@example.com", task_id, "on my way"))
        .unwrap();

    // first attempt hits an unreachable server: nothing is purged
    server.inner.reject.store(true, Ordering::SeqCst);
    let outcome = coordinator.trigger().await;
    assert!(matches!(outcome, SyncOutcome::Failed { .. }));

    let pending = store.pending_operations().unwrap();
    assert_eq!(pending.len(), 3);
    assert_eq!(pending[0].op_type, OpType::Create);
    assert_eq!(pending[1].op_type, OpType::Update);
    assert_eq!(pending[2].op_type, OpType::Create);
    assert!(pending.iter().all(|op| op.retry_count == 1));

    // connectivity restored: the same batch drains in order
    server.inner.reject.store(false, Ordering::SeqCst);
    let outcome = coordinator.trigger().await;
    assert_eq!(outcome, SyncOutcome::Synced { uploaded: 3 });
    assert_eq!(store.pending_count().unwrap(), 0);

    let accepted = server.accepted();
    assert_eq!(accepted.len(), 3);
    assert!(accepted.windows(2).all(|w| w[0].client_ts < w[1].client_ts));
    assert_eq!(accepted[1].payload["titulo"], "Buy milk and bread");

    // acknowledged records remain queryable
    let facade = QueryFacade::new(&store);
    let detail = facade.task_by_id(task_id).unwrap().unwrap();
    assert_eq!(detail.task.record.title, "Buy milk and bread");
    assert_eq!(facade.comments_by_task(task_id).unwrap().len(), 1);
}

#[tokio::test]
async fn delete_is_immediate_locally_but_acknowledged_later() {
    let server = FakeServer::default();
    let (store, coordinator) = build(server.clone());

    let task_id = store.create(Task::new("Temporary", 1)).unwrap();
    store.delete(EntityKind::Task, task_id).unwrap();

    let facade = QueryFacade::new(&store);
    assert!(facade.task_by_id(task_id).unwrap().is_none());
    assert_eq!(store.pending_count().unwrap(), 2);

    coordinator.trigger().await;
    assert_eq!(store.pending_count().unwrap(), 0);
    let accepted = server.accepted();
    assert_eq!(accepted[1].op_type, OpType::Delete);
    assert_eq!(accepted[1].payload["titulo"], "Temporary");
}

#[tokio::test]
async fn snapshot_pull_replaces_the_mirror() {
    let server = FakeServer::default();
    *server
        .inner
        .snapshot
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = serde_json::from_value(serde_json::json!({
        "user_email": "ana@example.com",
        "workspaces": [{"id_workspace": 2, "nome": "Projects", "criador": "ana@example.com"}],
        "categorias": [{"id_categoria": 3, "nome": "urgent", "id_workspace": 2}],
        "tarefas": [{"id_tarefa": 5, "titulo": "From the server", "id_usuario": 1,
                     "id_workspace": 2, "categorias": [3]}]
    }))
    .unwrap();

    let (store, coordinator) = build(server);
    store.create(Task::new("Stale local task", 1)).unwrap();

    let stats = coordinator.pull_snapshot().await.unwrap();
    assert_eq!(stats.total(), 3);

    let facade = QueryFacade::new(&store);
    let tasks = facade.tasks_by_workspace(2).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].record.id, Some(5));
    let detail = facade.task_by_id(5).unwrap().unwrap();
    assert_eq!(detail.categories[0].name, "urgent");
    // the stale local task was replaced wholesale, its pending op was not
    assert_eq!(facade.table_counts().unwrap().tasks, 1);
    assert_eq!(store.pending_count().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn connectivity_flap_produces_one_batch() {
    let server = FakeServer::default();
    let (store, coordinator) = build(server.clone());
    store.create(Task::new("Queued while offline", 1)).unwrap();

    let monitor = Arc::new(NetworkMonitor::new());
    let driver_monitor = Arc::clone(&monitor);
    let driver_coordinator = Arc::clone(&coordinator);
    tokio::spawn(async move {
        drive_sync(&driver_monitor, driver_coordinator, Duration::from_secs(2)).await;
    });
    tokio::task::yield_now().await;

    // available → lost → available within two seconds
    monitor.report(Transport::Wifi);
    monitor.report(Transport::None);
    monitor.report(Transport::Wifi);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(server.inner.pushes.load(Ordering::SeqCst), 1);
    assert_eq!(store.pending_count().unwrap(), 0);
}
