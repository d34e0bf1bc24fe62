//! Method-and-path routing.
//!
//! Paths are exact: the service has no path parameters. A method with no tree
//! at all, or a path missing from its tree, both resolve to no endpoint and
//! the server answers `404`.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{Handler, SharedEndpoint};
use crate::method::Method;

/// The application router.
///
/// Build it once at startup and hand it to [`Server::serve`](crate::Server::serve).
/// Registrations return `self` so they chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<SharedEndpoint>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for one method + path pair.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(&[method], path, handler)
    }

    /// Register one handler under several methods on the same path.
    ///
    /// The handler is boxed once and shared by every method tree.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Router::on`].
    pub fn route(mut self, methods: &[Method], path: &str, handler: impl Handler) -> Self {
        let endpoint = handler.into_endpoint();
        for &method in methods {
            self.routes
                .entry(method)
                .or_default()
                .insert(path, Arc::clone(&endpoint))
                .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        }
        self
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Option<SharedEndpoint> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        Some(Arc::clone(matched.value))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
