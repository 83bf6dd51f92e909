//! Current caller handler.
//!
//! Returns the identity the auth middleware attached to the request.

use crate::auth::identity::IdentityContext;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /v1/me
///
/// Requires the auth middleware.
///
/// ## Response
///
/// ```json
/// {
///   "tenantId": "tenant123",
///   "username": "shree",
///   "email": "shree@vmware.com",
///   "idmDomain": "vmware.com",
///   "decoded": { "prn": "shree@vmware.com", "...": "..." }
/// }
/// ```
#[instrument(skip_all, name = "connector.handlers.me")]
pub async fn get_me(Extension(identity): Extension<IdentityContext>) -> Json<IdentityContext> {
    tracing::debug!(target: "connector.handlers.me", "Returning caller identity");
    Json(identity)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_me_returns_identity() {
        let identity = IdentityContext {
            tenant_id: "tenant123".to_string(),
            username: "shree".to_string(),
            email: "shree@vmware.com".to_string(),
            idm_domain: "vmware.com".to_string(),
            pre_hire: Some(true),
            decoded: json!({"prn": "shree@vmware.com"}),
        };

        let Json(body) = get_me(Extension(identity.clone())).await;
        assert_eq!(body, identity);
    }
}
