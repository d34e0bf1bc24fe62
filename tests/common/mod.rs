//! Shared harness: a real server on an ephemeral port over a temp database.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use tempfile::TempDir;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use todo_stations::{Error, Lifecycle, Phase, Router, SqliteStore, TodoStore, routes};

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub phases: watch::Receiver<Phase>,
    shutdown: Option<oneshot::Sender<()>>,
    running: JoinHandle<Result<(), Error>>,
    store: Arc<SqliteStore>,
    _dir: TempDir,
}

pub fn tokyo() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

/// Serves the real route table.
#[allow(dead_code)]
pub async fn spawn_app() -> TestApp {
    spawn_with(routes, Duration::from_secs(5)).await
}

/// Serves whatever router `build` returns over a fresh store.
#[allow(dead_code)]
pub async fn spawn_with<F>(build: F, shutdown_timeout: Duration) -> TestApp
where
    F: FnOnce(Arc<dyn TodoStore>) -> Router,
{
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("todo.db"), tokyo()).unwrap());

    let lifecycle = Lifecycle::new();
    let phases = lifecycle.subscribe();
    let server = lifecycle
        .bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap()
        .shutdown_timeout(shutdown_timeout);
    let addr = server.local_addr();

    let (tx, rx) = oneshot::channel::<()>();
    let shared: Arc<dyn TodoStore> = store.clone();
    let router = build(shared);
    let running = tokio::spawn(async move {
        lifecycle
            .run(server, router, async move {
                let _ = rx.await;
            })
            .await
    });

    TestApp {
        addr,
        client: reqwest::Client::new(),
        phases,
        shutdown: Some(tx),
        running,
        store,
        _dir: dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Fires the shutdown signal without waiting for the drain.
    #[allow(dead_code)]
    pub fn signal(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Signals, waits for `Stopped`, then closes the store.
    pub async fn stop(mut self) {
        self.signal();
        self.running.await.unwrap().unwrap();
        assert_eq!(*self.phases.borrow(), Phase::Stopped);
        self.store.close().await.unwrap();
    }
}
