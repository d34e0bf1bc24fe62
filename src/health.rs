//! Health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can the store still be reached? |

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::status::Status;
use crate::store::TodoStore;

#[derive(Serialize)]
struct HealthzResponse {
    message: &'static str,
}

/// Liveness probe. Always `200 {"message":"OK"}`.
pub async fn liveness(_req: Request) -> Response {
    Json(HealthzResponse { message: "OK" }).into_response()
}

/// Readiness probe. `200 {"message":"ready"}` while the store answers a
/// round-trip, `503` otherwise.
pub async fn readiness(store: Arc<dyn TodoStore>) -> Response {
    match store.ping().await {
        Ok(()) => Json(HealthzResponse { message: "ready" }).into_response(),
        Err(e) => {
            warn!("readiness check failed: {e}");
            Response::status(Status::ServiceUnavailable)
        }
    }
}
