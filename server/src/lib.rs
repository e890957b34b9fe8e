//! JSON CRUD service for todo items backed by SQLite.
//!
//! # Overview
//! - [`store`] owns the single database connection and all SQL.
//! - [`api`] maps `/api/todos` requests onto store calls.
//! - [`error`] turns failures into `{ "error": ... }` responses.
//! - [`config`] reads the listen address and database path from the
//!   environment.

pub mod api;
pub mod config;
pub mod error;
pub mod store;
mod validation;

use std::sync::Arc;

use tokio::net::TcpListener;

pub use api::app;
pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use store::{Store, StoreError, StoreResult, Todo};

/// Serves the API on `listener` until the process exits.
pub async fn run(listener: TcpListener, store: Arc<Store>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(store)).await
}
