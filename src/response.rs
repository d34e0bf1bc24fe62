//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. Error responses in this
//! service carry a status and no body; success responses carry JSON.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::Full;
use serde::Serialize;
use tracing::error;

use crate::status::Status;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use todo_stations::{Response, Status};
///
/// Response::json(&serde_json::json!({ "message": "OK" }));
/// Response::status(Status::NotFound);
/// ```
pub struct Response {
    inner: http::Response<Full<Bytes>>,
}

impl Response {
    /// `200 OK` with an `application/json` body.
    ///
    /// A value that fails to serialize is logged and answered with `500`.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                let mut inner = http::Response::new(Full::new(Bytes::from(body)));
                inner
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Self { inner }
            }
            Err(e) => {
                error!("failed to encode response body: {e}");
                Self::status(Status::InternalServerError)
            }
        }
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        let mut inner = http::Response::new(Full::new(Bytes::new()));
        *inner.status_mut() = code.into();
        Self { inner }
    }

    pub fn status_code(&self) -> http::StatusCode {
        self.inner.status()
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        self.inner
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

/// Return a [`Status`] directly from a handler: `return Status::NotFound`
impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}

/// A serde value answered as `200 OK` JSON.
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response { Response::json(&self.0) }
}
