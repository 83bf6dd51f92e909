//! Authentication middleware for protected routes.
//!
//! Extracts the bearer token from the `Authorization` header, verifies it against
//! the cached signing key with the request's external URL as audience, and
//! attaches the resulting identity to request extensions. Any failure ends the
//! request with `401 Unauthorized`; the downstream handler never runs.

use crate::auth::identity::IdentityContext;
use crate::auth::key_cache::KeyCache;
use crate::auth::key_source::{HttpKeySource, SigningKeySource};
use crate::auth::verifier::TokenVerifier;
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::errors::AuthError;
use crate::middleware::forwarded::external_url;
use crate::observability::metrics;
use crate::request_state::{contribute, RequestState};
use axum::{
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

/// Per-request authentication over a shared key cache.
pub struct RequestAuthenticator {
    config: AuthConfig,
    key_cache: KeyCache,
    verifier: TokenVerifier,
}

impl RequestAuthenticator {
    /// Authenticator fetching keys over HTTP and using the system clock.
    pub fn new(config: AuthConfig) -> Self {
        let source = Arc::new(HttpKeySource::new(config.key_fetch_timeout));
        Self::with_parts(config, source, Arc::new(SystemClock))
    }

    /// Authenticator with an explicit key source and clock.
    pub fn with_parts(
        config: AuthConfig,
        source: Arc<dyn SigningKeySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key_cache = KeyCache::with_ttl(source, Arc::clone(&clock), config.key_cache_ttl);
        let verifier = TokenVerifier::new(clock);
        Self {
            config,
            key_cache,
            verifier,
        }
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.key_cache
    }

    /// Authenticate one request.
    ///
    /// `original_uri` is the URI as received, before any router nesting stripped
    /// a prefix from it.
    ///
    /// # Errors
    ///
    /// Returns the first failure among key lookup and token verification.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
        headers: &HeaderMap,
        original_uri: &Uri,
    ) -> Result<IdentityContext, AuthError> {
        let token = bearer_credential(authorization);
        let audience = external_url(headers, original_uri);

        let key = self.key_cache.get(self.config.key_url.as_deref()).await?;
        let claims = self
            .verifier
            .verify(token, &key, &audience, self.config.clock_tolerance)?;

        Ok(IdentityContext::build(&claims))
    }
}

/// The credential carried by an `Authorization` header value.
///
/// Surrounding whitespace and one leading `Bearer ` are removed. A missing header
/// yields the empty credential.
pub fn bearer_credential(authorization: Option<&str>) -> &str {
    let value = authorization.unwrap_or("").trim();
    value.strip_prefix("Bearer ").unwrap_or(value).trim()
}

/// Authentication middleware.
///
/// # Response
///
/// - `401 Unauthorized` with `{"message": ...}` and a `WWW-Authenticate` header
///   on any failure
/// - Otherwise continues with [`IdentityContext`] and the merged [`RequestState`]
///   in request extensions
#[instrument(skip_all, name = "auth.middleware")]
pub async fn require_identity(
    State(authenticator): State<Arc<RequestAuthenticator>>,
    mut req: Request,
    next: Next,
) -> Response {
    let original_uri = req
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| req.uri().clone(), |uri| uri.0.clone());

    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let result = authenticator
        .authenticate(authorization, req.headers(), &original_uri)
        .await;

    match result {
        Ok(identity) => {
            metrics::record_authentication("success");
            let state = contribute(req.extensions_mut(), RequestState::from(identity.clone()));
            tracing::debug!(target: "auth.middleware", context = %state, "Request authenticated");
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            metrics::record_authentication(e.kind());
            let state = req
                .extensions()
                .get::<RequestState>()
                .cloned()
                .unwrap_or_default();
            tracing::warn!(
                target: "auth.middleware",
                context = %state,
                path = %original_uri.path(),
                error_kind = e.kind(),
                error = %e,
                "Request rejected"
            );
            e.into_rejection(authenticator.config.error_detail)
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_prefix_is_stripped() {
        assert_eq!(bearer_credential(Some("Bearer abc.def.ghi")), "abc.def.ghi");
        assert_eq!(bearer_credential(Some("  Bearer   abc.def.ghi  ")), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_empty_credential() {
        assert_eq!(bearer_credential(None), "");
        assert_eq!(bearer_credential(Some("   ")), "");
    }

    #[test]
    fn test_prefix_is_case_sensitive_and_stripped_once() {
        assert_eq!(bearer_credential(Some("bearer abc")), "bearer abc");
        assert_eq!(bearer_credential(Some("Bearer Bearer abc")), "Bearer abc");
    }

    #[test]
    fn test_raw_token_without_prefix_is_kept() {
        assert_eq!(bearer_credential(Some("abc.def.ghi")), "abc.def.ghi");
    }
}
