//! HTTP router configuration.
//!
//! This module provides functions to build the Axum router with all
//! necessary routes and middleware.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{handle_pseudonymize, handle_reset, health_check, readiness_check};
use crate::state::AppState;

/// Build the application router.
///
/// Routes:
/// - `POST /pseudonymize` - Run one pseudonymization call (form fields)
/// - `POST /reset` - Retry instance replacement
/// - `GET /health` - Health check
/// - `GET /ready` - Readiness check
///
/// The timeout layer cancels the waiting HTTP caller only; an in-flight
/// module call is never preempted.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let bridge_routes = Router::new()
        .route("/pseudonymize", post(handle_pseudonymize))
        .route("/reset", post(handle_reset));

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check));

    Router::new()
        .merge(bridge_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use oprf_bridge_common::RuntimeConfig;
    use tower::util::ServiceExt;

    const ECHO_WAT: &str = r#"
        (module
            (memory (export "memory") 1)
            (global $next (mut i32) (i32.const 8))
            (func (export "alloc") (param $len i32) (result i32)
                (local $ptr i32)
                (local.set $ptr (global.get $next))
                (global.set $next (i32.add (global.get $next) (local.get $len)))
                (local.get $ptr))
            (func (export "pseudonymize") (param $ptr i32) (param $len i32) (result i64)
                (i64.or
                    (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                    (i64.extend_i32_u (local.get $len)))))
    "#;

    fn setup_state() -> AppState {
        let config = RuntimeConfig::default();
        AppState::new(&config).unwrap()
    }

    fn setup_router(state: AppState) -> Router {
        build_router(state, Duration::from_secs(30))
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/pseudonymize")
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_router(setup_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_gates_on_load() {
        let state = setup_state();
        let app = setup_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.load_module_wat(ECHO_WAT).await.unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_pseudonymize_before_load_is_unavailable() {
        let app = setup_router(setup_state());

        let response = app
            .oneshot(form_request("mode=1&suite=AES&return-info=true&data=a%3Bb"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_pseudonymize_round_trip() {
        let state = setup_state();
        state.load_module_wat(ECHO_WAT).await.unwrap();
        let app = setup_router(state);

        let response = app
            .oneshot(form_request("mode=1&suite=AES&return-info=true&data=a%3Bb"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "mode": 1,
                "suite": "AES",
                "return-info": true,
                "data": ["a", "b"],
            })
        );
    }

    #[tokio::test]
    async fn test_pseudonymize_malformed_mode_is_bad_request() {
        let state = setup_state();
        state.load_module_wat(ECHO_WAT).await.unwrap();
        let app = setup_router(state);

        let response = app
            .oneshot(form_request("mode=base&suite=AES&data=a"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reset_endpoint() {
        let state = setup_state();
        state.load_module_wat(ECHO_WAT).await.unwrap();
        let app = setup_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
