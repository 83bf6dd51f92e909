//! HTTP routes.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    add_context_path, propagate_request_id, read_backend_headers, require_identity,
    RequestAuthenticator,
};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authenticator for protected routes. Owns the signing key cache.
    pub authenticator: Arc<RequestAuthenticator>,
}

impl AppState {
    /// State with an HTTP key source and the system clock.
    pub fn new(config: Config) -> Self {
        let authenticator = Arc::new(RequestAuthenticator::new(config.auth.clone()));
        Self {
            config,
            authenticator,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/v1/me` - Caller identity - requires authentication
/// - Request id, backend header and routing header propagation
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/v1/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            require_identity,
        ));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. add_context_path, read_backend_headers - Upstream context into RequestState
    // 4. propagate_request_id - Seed RequestState before authentication (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(add_context_path))
        .layer(middleware::from_fn(read_backend_headers))
        .layer(middleware::from_fn(propagate_request_id))
}
