//! # todo-stations
//!
//! A minimal REST service for TODO items stored in SQLite, with graceful,
//! timeout-bounded shutdown on SIGINT / SIGTERM.
//!
//! ## Layers
//!
//! - **Persistence gateway**: [`TodoStore`], implemented by [`SqliteStore`].
//!   Thin CRUD over one table; reports zero-row updates and deletes as
//!   [`StoreError::NotFound`].
//! - **Request handler**: [`TodoHandler`]. Validates input before the
//!   gateway is called and maps each outcome onto a status code.
//! - **Lifecycle**: [`Lifecycle`] and [`Server`]. Binds, serves, waits for a
//!   signal, drains for at most [`SHUTDOWN_TIMEOUT`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::FixedOffset;
//! use todo_stations::{Lifecycle, SqliteStore, TodoStore, routes, shutdown_signal};
//!
//! # async fn run() -> Result<(), todo_stations::Error> {
//! let offset = FixedOffset::east_opt(9 * 3600).unwrap();
//! let store = Arc::new(SqliteStore::open(".sqlite3/todo.db", offset)?);
//!
//! let lifecycle = Lifecycle::new();
//! let server = lifecycle.bind("0.0.0.0:8080".parse().unwrap()).await?;
//! lifecycle.run(server, routes(store.clone()), shutdown_signal()).await?;
//! store.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ```text
//! curl -X POST localhost:8080/todos -d '{"subject":"buy milk"}'
//! curl 'localhost:8080/todos?prev_id=0&size=10'
//! curl -X PUT localhost:8080/todos -d '{"id":1,"subject":"buy oat milk"}'
//! curl -X DELETE localhost:8080/todos -d '{"ids":[1]}'
//! ```

mod app;
mod error;
mod handler;
mod lifecycle;
mod method;
mod request;
mod response;
mod router;
mod server;
mod sqlite;
mod status;
mod store;
mod todo;

pub mod config;
pub mod health;
pub mod model;

pub use app::{routes, run};
pub use config::Config;
pub use error::{Error, TodoError};
pub use handler::Handler;
pub use lifecycle::{Lifecycle, Phase, shutdown_signal};
pub use method::{Method, UnknownMethod};
pub use request::{MAX_BODY_BYTES, Request};
pub use response::{IntoResponse, Json, Response};
pub use router::Router;
pub use server::{SHUTDOWN_TIMEOUT, Server};
pub use sqlite::SqliteStore;
pub use status::Status;
pub use store::{StoreError, TodoStore};
pub use todo::TodoHandler;
