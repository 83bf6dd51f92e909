//! Health check handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,

    /// Whether a signing key URL is configured. Without one every protected
    /// request is rejected.
    pub key_url_configured: bool,

    /// Whether a signing key has been fetched. It may have expired since.
    pub signing_key_cached: bool,
}

/// Handler for GET /health
///
/// Liveness probe. Always 200; a missing key URL is reported, not failed on.
#[instrument(skip_all, name = "connector.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let key_url_configured = state.config.auth.key_url.is_some();
    if !key_url_configured {
        tracing::warn!(target: "connector.health", "Health check: signing key URL is not configured");
    }

    let signing_key_cached = state.authenticator.key_cache().peek().await.is_some();

    Json(HealthResponse {
        status: "healthy".to_string(),
        key_url_configured,
        signing_key_cached,
    })
}
