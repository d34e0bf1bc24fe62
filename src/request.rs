//! Incoming HTTP request type.

use bytes::Bytes;
use http::Uri;
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use serde::de::DeserializeOwned;

use crate::method::Method;

/// Largest request body read by default. Item envelopes are a few hundred
/// bytes at most.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An incoming HTTP request with its body fully read.
pub struct Request {
    method: Method,
    uri: Uri,
    body: Bytes,
}

impl Request {
    /// Builds a request outside the server, e.g. to call a handler directly.
    pub fn new(method: Method, uri: Uri, body: impl Into<Bytes>) -> Self {
        Self { method, uri, body: body.into() }
    }

    /// Reads the body to completion, failing once it exceeds `limit` bytes.
    pub(crate) async fn read<B>(
        method: Method,
        req: http::Request<B>,
        limit: usize,
    ) -> Result<Self, BoxError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body = Limited::new(body, limit).collect().await?.to_bytes();
        Ok(Self { method, uri: parts.uri, body })
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
