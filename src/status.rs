//! HTTP status codes the service answers with.
//!
//! ```rust
//! use todo_stations::{Response, Status};
//!
//! // status-only, no body
//! Response::status(Status::BadRequest);
//! ```

/// Status codes produced by the TODO service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    ServiceUnavailable,  // 503
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> Self {
        match s {
            Status::Ok                  => Self::OK,
            Status::BadRequest          => Self::BAD_REQUEST,
            Status::NotFound            => Self::NOT_FOUND,
            Status::MethodNotAllowed    => Self::METHOD_NOT_ALLOWED,
            Status::InternalServerError => Self::INTERNAL_SERVER_ERROR,
            Status::ServiceUnavailable  => Self::SERVICE_UNAVAILABLE,
        }
    }
}
