//! HTTP request dispatcher.
//!
//! Decodes inbound requests into coordinator calls and encodes results back
//! into responses. Everything here is plumbing around the core in
//! [`crate::coordinator`]; no locking or notification logic lives at this
//! layer.

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

mod body;
mod handlers;
mod middleware;
mod router;

pub use body::{parse_poll_body, parse_write_body, BodyError};
pub use handlers::{CasResponse, CurrentState, ServerState};
pub use router::build_router;

/// Serve the API on `listener` until shutdown is signalled.
pub async fn serve(listener: TcpListener, state: ServerState) -> Result<()> {
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}
