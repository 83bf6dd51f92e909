//! Authentication error types.
//!
//! Every failure in the authentication pipeline is an [`AuthError`]. None of them
//! escape the middleware: each one is turned into a [`Rejection`], which always
//! renders as `401 Unauthorized` with a JSON `{"message": ...}` body, so callers
//! cannot tell which check failed from the status code alone.

use crate::config::ErrorDetail;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to clients when error detail is set to generic.
pub const GENERIC_REJECTION_MESSAGE: &str = "The access token is invalid or expired";

/// Prefix for detailed token validation failures.
const TOKEN_FAILURE_PREFIX: &str = "Failed to validate token.";

/// Authentication pipeline error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The signing key source URL is not configured.
    #[error("{0}")]
    Configuration(String),

    /// The signing key could not be retrieved or is not usable.
    #[error("{0}")]
    KeyFetch(String),

    /// The credential is empty, oversized, not a JWT, or lacks required claims.
    #[error("{0}")]
    MalformedToken(String),

    /// The signature does not verify against the current signing key.
    #[error("invalid signature")]
    SignatureInvalid,

    /// The token header names an algorithm other than RS256.
    #[error("invalid algorithm: {0}")]
    AlgorithmRejected(String),

    /// The token is outside its validity window (`exp`, `nbf`, `iat`).
    #[error("{0}")]
    Expired(String),

    /// The token audience does not match the invoked endpoint.
    #[error("jwt audience invalid. expected: {expected}")]
    AudienceMismatch { expected: String },
}

impl AuthError {
    /// Bounded label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration",
            AuthError::KeyFetch(_) => "key_fetch",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::AlgorithmRejected(_) => "algorithm_rejected",
            AuthError::Expired(_) => "expired",
            AuthError::AudienceMismatch { .. } => "audience_mismatch",
        }
    }

    /// Whether the failure came from the token itself rather than the key lookup.
    pub fn is_token_failure(&self) -> bool {
        !matches!(self, AuthError::Configuration(_) | AuthError::KeyFetch(_))
    }

    /// Message shown to the client for this failure.
    pub fn client_message(&self, detail: ErrorDetail) -> String {
        match detail {
            ErrorDetail::Generic => GENERIC_REJECTION_MESSAGE.to_string(),
            ErrorDetail::Detailed if self.is_token_failure() => {
                format!("{TOKEN_FAILURE_PREFIX} {self}")
            }
            ErrorDetail::Detailed => self.to_string(),
        }
    }

    /// Convert into the 401 response sent to the client.
    pub fn into_rejection(self, detail: ErrorDetail) -> Rejection {
        Rejection {
            message: self.client_message(detail),
        }
    }
}

/// A rejected request.
///
/// Rendered as `401 Unauthorized` with a `WWW-Authenticate: Bearer` challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub message: String,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::UNAUTHORIZED, Json(self)).into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer error=\"invalid_token\""),
        );
        response
    }
}
