//! Axum router configuration.
//!
//! Three routes, all keyed by register name:
//!
//! ```text
//! GET  /{name}        - read current value
//! POST /{name}        - compare-and-swap write
//! POST /{name}/poll   - long-poll for a change
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::server::handlers::{poll_register, read_register, write_register, ServerState};
use crate::server::middleware;

/// Build the router with all routes and the CORS layer.
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/{name}", get(read_register).post(write_register))
        .route("/{name}/poll", post(poll_register))
        .layer(axum::middleware::from_fn(middleware::allow_all_origins))
        .with_state(state)
}
