//! Process lifecycle: bind, serve, wait for a termination signal, drain.
//!
//! ```text
//! Starting ──bind──▶ Listening ──signal──▶ ShuttingDown ──drained/timeout──▶ Stopped
//! ```
//!
//! [`Lifecycle::run`] schedules two tasks: the listener task running
//! [`Server::serve`], and a watcher task that waits for the signal and then
//! flips a one-shot cancellation flag the listener task is waiting on. `run`
//! joins both and only then reports [`Phase::Stopped`].
//!
//! # Kubernetes
//!
//! Pods get SIGTERM and `terminationGracePeriodSeconds` (30 s by default)
//! before SIGKILL. The drain is bounded well inside that by
//! [`SHUTDOWN_TIMEOUT`](crate::SHUTDOWN_TIMEOUT).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{error, info};

use crate::error::Error;
use crate::router::Router;
use crate::server::Server;

/// Where the process is in its lifetime. Only ever moves forward.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum Phase {
    Starting,
    Listening,
    ShuttingDown,
    Stopped,
}

/// Drives one server through [`Phase`]s and publishes each transition.
pub struct Lifecycle {
    phase: Arc<watch::Sender<Phase>>,
    ran: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Starting);
        Self { phase: Arc::new(phase), ran: AtomicBool::new(false) }
    }

    /// Observes phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// `Starting → Listening`. A bind failure leaves the phase at `Starting`.
    pub async fn bind(&self, addr: SocketAddr) -> Result<Server, Error> {
        let server = Server::bind(addr).await?;
        self.phase.send_replace(Phase::Listening);
        Ok(server)
    }

    /// `Listening → ShuttingDown → Stopped`.
    ///
    /// Serves `router` until `signal` resolves, then drains. Returns once
    /// both the listener task and the watcher task have finished.
    ///
    /// Runs at most once per `Lifecycle`: outside `Listening` it returns
    /// [`Error::Phase`] without serving.
    pub async fn run<S>(&self, server: Server, router: Router, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let current = self.phase();
        if current != Phase::Listening || self.ran.swap(true, Ordering::SeqCst) {
            return Err(Error::Phase(current));
        }

        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let phase = Arc::clone(&self.phase);
        let watcher = tokio::spawn(async move {
            signal.await;
            phase.send_replace(Phase::ShuttingDown);
            cancel_tx.send_replace(true);
        });

        let listener = tokio::spawn(server.serve(router, async move {
            // An Err means the watcher is gone without firing; stop anyway.
            let _ = cancel_rx.wait_for(|&cancelled| cancelled).await;
        }));

        let served = listener.await;

        // The listener only returns early on error; the watcher would then
        // wait on a signal forever.
        if !watcher.is_finished() {
            watcher.abort();
        }
        let _ = watcher.await;

        self.phase.send_replace(Phase::Stopped);
        info!("stopped");

        served?
    }
}

impl Default for Lifecycle {
    fn default() -> Self { Self::new() }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGINT (Ctrl-C) or SIGTERM the process receives.
///
/// On Windows only Ctrl-C is available. A handler that cannot be installed
/// is logged and that arm never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => info!("received SIGINT"),
        () = sigterm => info!("received SIGTERM"),
    }
}
