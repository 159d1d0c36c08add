//! Request handlers for the bridge.
//!
//! This module wires the host form boundary to the core: raw fields in,
//! adapter, bridge invocation, result JSON out.

use std::collections::HashMap;

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{info, instrument, warn};

use oprf_bridge_common::BridgeError;
use oprf_bridge_core::RequestAdapter;

use crate::response::BridgeResponse;
use crate::state::AppState;

/// Run one pseudonymization call.
///
/// This handler:
/// 1. Adapts the raw form fields into the typed request
/// 2. Invokes the module through the bridge
/// 3. Returns the module's result verbatim as JSON
///
/// Adapter errors are reported before any module call is attempted.
#[instrument(skip(state, fields))]
pub async fn handle_pseudonymize(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let request = match RequestAdapter::adapt(&fields) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected malformed form submission");
            return error_to_response(&e).into_axum_response();
        }
    };

    match state.bridge().invoke(&request).await {
        Ok(result) => {
            BridgeResponse::json(200, &result.into_value().to_string()).into_axum_response()
        }
        Err(e) => {
            warn!(error = %e, "Invocation failed");
            error_to_response(&e).into_axum_response()
        }
    }
}

/// Retry instance replacement after a failed reset.
pub async fn handle_reset(State(state): State<AppState>) -> impl IntoResponse {
    match state.bridge().reset().await {
        Ok(()) => {
            info!("Instance reset via endpoint");
            BridgeResponse::json(200, r#"{"status":"reset"}"#).into_axum_response()
        }
        Err(e) => error_to_response(&e).into_axum_response(),
    }
}

/// Convert a bridge error to an HTTP response.
fn error_to_response(error: &BridgeError) -> BridgeResponse {
    match error {
        BridgeError::MalformedField { .. } => BridgeResponse::error(400, &error.to_string()),
        BridgeError::Busy => BridgeResponse::error(429, &error.to_string()),
        BridgeError::NotReady | BridgeError::InstantiationFailed { .. } => {
            BridgeResponse::error(503, &error.to_string())
        }
        BridgeError::FuelExhausted => {
            BridgeResponse::error(429, "Execution limit exceeded: fuel exhausted")
        }
        BridgeError::ModuleFault { .. } => BridgeResponse::error(500, &error.to_string()),
        _ => BridgeResponse::error(500, "Internal server error"),
    }
}

/// Health check handler.
///
/// Returns 200 OK if the server is running.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
///
/// The enable flag for the host UI: 200 once the module image is loaded
/// and an instance is current, 503 otherwise.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_ready() {
        (
            StatusCode::OK,
            axum::Json(serde_json::json!({"status": "ready"})),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(serde_json::json!({"status": "loading"})),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_to_response_malformed_field() {
        let err = BridgeError::malformed_field("mode", "not a base-10 integer");
        let resp = error_to_response(&err);
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn test_error_to_response_busy() {
        let resp = error_to_response(&BridgeError::Busy);
        assert_eq!(resp.status, 429);
    }

    #[test]
    fn test_error_to_response_not_ready() {
        let resp = error_to_response(&BridgeError::NotReady);
        assert_eq!(resp.status, 503);
    }

    #[test]
    fn test_error_to_response_module_fault() {
        let err = BridgeError::module_fault("wasm trap: unreachable", None);
        let resp = error_to_response(&err);
        assert_eq!(resp.status, 500);
        assert!(String::from_utf8_lossy(&resp.body).contains("unreachable"));
    }

    #[test]
    fn test_error_to_response_load_failed_is_opaque() {
        let err = BridgeError::load_failed("bad magic number");
        let resp = error_to_response(&err);
        assert_eq!(resp.status, 500);
        assert!(String::from_utf8_lossy(&resp.body).contains("Internal server error"));
    }
}
