//! Route table and the startup sequence of the service.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::error::Error;
use crate::health;
use crate::lifecycle::Lifecycle;
use crate::method::Method;
use crate::request::Request;
use crate::router::Router;
use crate::sqlite::SqliteStore;
use crate::store::TodoStore;
use crate::todo::TodoHandler;

/// `/todos` for the four TODO methods plus the health probes.
pub fn routes(store: Arc<dyn TodoStore>) -> Router {
    let todos = Arc::new(TodoHandler::new(Arc::clone(&store)));

    Router::new()
        .route(
            &[Method::Post, Method::Get, Method::Put, Method::Delete],
            "/todos",
            move |req: Request| {
                let todos = Arc::clone(&todos);
                async move { todos.serve(req).await }
            },
        )
        .on(Method::Get, "/healthz", health::liveness)
        .on(Method::Get, "/readyz", move |_req: Request| health::readiness(Arc::clone(&store)))
}

/// Opens the store, serves until `signal` resolves, then closes the store.
///
/// The store is closed exactly once on every path past opening it, including
/// a failed bind. A failure to serve is returned in preference to a failure
/// to close, which is then only logged.
pub async fn run<S>(config: Config, signal: S) -> Result<(), Error>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = config.listen_addr()?;
    let store = Arc::new(SqliteStore::open(&config.db_path, config.utc_offset)?);

    let lifecycle = Lifecycle::new();
    let served = match lifecycle.bind(addr).await {
        Ok(server) => {
            info!(addr = %server.local_addr(), db = %config.db_path.display(), "todo-stations starting");
            lifecycle.run(server, routes(store.clone()), signal).await
        }
        Err(e) => Err(e),
    };

    let closed = store.close().await;
    match served {
        Ok(()) => closed.map_err(Error::from),
        Err(e) => {
            if let Err(close_err) = closed {
                error!("failed to close store: {close_err}");
            }
            Err(e)
        }
    }
}
