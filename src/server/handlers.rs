//! HTTP handlers decoding requests into coordinator calls.
//!
//! Handlers validate the register name and the body before the coordinator
//! (and therefore the store) is ever touched. Store-level failures indicate
//! an unhealthy state directory and surface as 500s.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::coordinator::Coordinator;
use crate::error::RegisterError;
use crate::server::body::{parse_poll_body, parse_write_body};
use crate::store::is_valid_register_name;

/// Shared state for all routes.
#[derive(Clone)]
pub struct ServerState {
    /// The register coordinator.
    pub coordinator: Arc<Coordinator>,
}

/// Response body for reads and polls.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CurrentState {
    /// The register's current value; `null` for a register never written.
    pub current_state: Value,
}

/// Response body for CAS writes.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CasResponse {
    /// Whether the swap was applied.
    pub success: bool,
    /// The new value on success, the actual current value on mismatch.
    pub current_state: Value,
}

/// `GET /{name}` — current value, absent mapped to `null`.
pub async fn read_register(
    Path(name): Path<String>,
    State(state): State<ServerState>,
) -> Response {
    if let Err(rejection) = check_name(&name) {
        return rejection;
    }
    match state.coordinator.read(&name).await {
        Ok(current_state) => Json(CurrentState { current_state }).into_response(),
        Err(e) => register_failure(&name, e),
    }
}

/// `POST /{name}` — compare-and-swap write.
///
/// A mismatch is a 200 with `success: false`, not an error status.
pub async fn write_register(
    Path(name): Path<String>,
    State(state): State<ServerState>,
    body: Bytes,
) -> Response {
    if let Err(rejection) = check_name(&name) {
        return rejection;
    }
    let (old, new) = match parse_write_body(&body) {
        Ok(parts) => parts,
        Err(e) => return e.into_response(),
    };
    match state.coordinator.compare_and_swap(&name, &old, new).await {
        Ok(outcome) => Json(CasResponse {
            success: outcome.success,
            current_state: outcome.current_state,
        })
        .into_response(),
        Err(e) => register_failure(&name, e),
    }
}

/// `POST /{name}/poll` — long-poll until the value differs from the one the
/// caller last observed, then return it.
pub async fn poll_register(
    Path(name): Path<String>,
    State(state): State<ServerState>,
    body: Bytes,
) -> Response {
    if let Err(rejection) = check_name(&name) {
        return rejection;
    }
    let expected = match parse_poll_body(&body) {
        Ok(value) => value,
        Err(e) => return e.into_response(),
    };
    match state.coordinator.wait_for_change(&name, &expected).await {
        Ok(current_state) => Json(CurrentState { current_state }).into_response(),
        Err(e) => register_failure(&name, e),
    }
}

/// Dispatch-layer name validation; the store re-checks as defense in depth.
fn check_name(name: &str) -> Result<(), Response> {
    if is_valid_register_name(name) {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            format!("invalid register name: '{name}'"),
        )
            .into_response())
    }
}

fn register_failure(name: &str, e: RegisterError) -> Response {
    error!(register = name, error = %e, "register operation failed");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
