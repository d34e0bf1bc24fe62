//! Error types.
//!
//! Two layers live here. [`TodoError`] is what the TODO operations return and
//! what the dispatcher maps onto a status code. [`Error`] covers process-level
//! failures: opening the store, binding the port, reading configuration.
//! Those end the process.

use std::net::SocketAddr;

use thiserror::Error;

use crate::lifecycle::Phase;
use crate::store::StoreError;

/// Failure of a single TODO operation.
#[derive(Debug, Error)]
pub enum TodoError {
    /// Caller input failed a precondition. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// The referenced item does not exist.
    #[error("todo {0} not found")]
    NotFound(i64),

    /// The store failed for infrastructure reasons.
    #[error("persistence: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for TodoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}

/// Process-level failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid listen address `{0}`")]
    Addr(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// [`Lifecycle::run`](crate::Lifecycle::run) called outside `Listening`.
    #[error("cannot serve from phase {0:?}")]
    Phase(Phase),

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
