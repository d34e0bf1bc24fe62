//! Route handlers and how the router stores them.
//!
//! `/todos` is served by a closure over the shared [`TodoHandler`], the probes
//! by plain `async fn`s. Both end up behind the same [`Endpoint`] object:
//!
//! ```text
//! move |req: Request| async move { todos.serve(req).await }
//!        ↓ Router::route(&[..], "/todos", h)
//! h.into_endpoint()                  one Arc, shared by every method tree
//!        ↓ Router::lookup
//! endpoint.call(req).await           one vtable call per request
//! ```
//!
//! [`TodoHandler`]: crate::TodoHandler

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The boxed future an [`Endpoint`] hands back to the dispatcher.
pub(crate) type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe form of a handler.
///
/// Public only because [`Handler::into_endpoint`] names it.
#[doc(hidden)]
pub trait Endpoint: Send + Sync + 'static {
    fn call(&self, req: Request) -> ResponseFuture;
}

#[doc(hidden)]
pub type SharedEndpoint = Arc<dyn Endpoint>;

/// Anything the router accepts for a path.
///
/// Any `Fn(Request) -> impl Future<Output = impl IntoResponse>` that can be
/// shared across connection tasks qualifies. The trait is sealed, so that
/// blanket impl is the only one.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> SharedEndpoint;
}

mod sealed {
    use super::*;

    pub trait Sealed {}

    impl<F, Fut, R> Sealed for F
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
    }
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> SharedEndpoint {
        Arc::new(FnEndpoint(self))
    }
}

struct FnEndpoint<F>(F);

impl<F, Fut, R> Endpoint for FnEndpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> ResponseFuture {
        let pending = (self.0)(req);
        Box::pin(async move { pending.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::response::Json;
    use crate::status::Status;
    use http::{StatusCode, Uri};

    async fn not_found(_req: Request) -> Status {
        Status::NotFound
    }

    #[tokio::test]
    async fn async_fn_and_closure_both_become_endpoints() {
        let by_fn = not_found.into_endpoint();
        let by_closure = (|req: Request| async move { Json(req.path().to_owned()) }).into_endpoint();

        let res = by_fn.call(Request::new(Method::Get, Uri::from_static("/x"), "")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

        let res = by_closure.call(Request::new(Method::Get, Uri::from_static("/y"), "")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }
}
