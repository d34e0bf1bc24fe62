//! HTTP server and bounded graceful shutdown.
//!
//! When the shutdown future resolves the server:
//! 1. Stops calling `listener.accept()` and closes the listening socket, so
//!    new connections are refused.
//! 2. Tells every open connection to finish the request it is serving and
//!    close. Idle keep-alive connections close immediately.
//! 3. Waits for the connection tasks, at most `shutdown_timeout`
//!    ([`SHUTDOWN_TIMEOUT`] by default). Whatever is still running after that
//!    is aborted.
//! 4. Returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::method::Method;
use crate::request::{MAX_BODY_BYTES, Request};
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

/// How long in-flight connections get to finish once shutdown starts.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A bound HTTP server.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
    shutdown_timeout: Duration,
    max_body: usize,
}

impl Server {
    /// Binds the listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr, shutdown_timeout: SHUTDOWN_TIMEOUT, max_body: MAX_BODY_BYTES })
    }

    /// Overrides the drain bound, [`SHUTDOWN_TIMEOUT`] by default.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Overrides the request body cap, [`MAX_BODY_BYTES`] by default. Larger
    /// bodies answer `400`.
    pub fn max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    /// The address actually bound, with the real port when `0` was asked for.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts connections and dispatches them through `router` until
    /// `shutdown` resolves, then drains.
    pub async fn serve<F>(self, router: Router, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let Self { listener, addr, shutdown_timeout, max_body } = self;
        let router = Arc::new(router);

        // Flipped once to tell every connection task to wind down.
        let (drain_tx, drain_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        tokio::pin!(shutdown);

        info!(%addr, "listening");

        loop {
            tokio::select! {
                // Shutdown wins over queued connections.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let mut drain = drain_rx.clone();

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req, max_body).await }
                        });

                        let builder = ConnBuilder::new(TokioExecutor::new());
                        let conn = builder.serve_connection(TokioIo::new(stream), svc);
                        tokio::pin!(conn);

                        let res = tokio::select! {
                            res = conn.as_mut() => res,
                            _ = drain.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.await
                            }
                        };
                        if let Err(e) = res {
                            debug!(%peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        drain_tx.send_replace(true);

        let drained = tokio::time::timeout(shutdown_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                timeout_ms = shutdown_timeout.as_millis() as u64,
                "drain timed out, closing remaining connections"
            );
            tasks.shutdown().await;
        }

        info!(%addr, "server stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Never fails: every error
/// becomes a status code.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    max_body: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = match Method::try_from(&method) {
        Err(_) => Response::status(Status::MethodNotAllowed),
        Ok(m) => match router.lookup(m, &path) {
            None => Response::status(Status::NotFound),
            Some(endpoint) => match Request::read(m, req, max_body).await {
                Ok(request) => endpoint.call(request).await,
                Err(e) => {
                    warn!(%method, %path, "failed to read request body: {e}");
                    Response::status(Status::BadRequest)
                }
            },
        },
    };

    info!(
        %method,
        %path,
        status = response.status_code().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    Ok(response.into_inner())
}
