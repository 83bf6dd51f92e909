//! JWT utilities shared across connector components.
//!
//! This module provides the checks that run around signature verification:
//! - Size limits for DoS prevention
//! - Clock tolerance constants
//! - Algorithm extraction from JWT headers (before any crypto work)
//! - `exp` / `nbf` / `iat` validity window checks against an explicit `now`
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The header `alg` is inspected before the key is touched, so callers can
//!   pin a single algorithm and reject `none` outright
//! - Window checks take `now` as an argument so callers can inject a clock
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_alg, validate_exp_at, DEFAULT_CLOCK_TOLERANCE};
//!
//! if extract_alg(token)? != "RS256" {
//!     return Err("algorithm not allowed");
//! }
//!
//! // After verifying the signature
//! validate_exp_at(claims.exp, DEFAULT_CLOCK_TOLERANCE, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations.
///
/// - Typical identity tokens are 600-1200 bytes (RS256 signature, a handful of claims)
/// - 8KB allows for large custom claim sets
/// - Checked BEFORE base64 decode and signature verification
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock tolerance between token issuer and verifier (60 seconds).
///
/// Applied to `exp`, `nbf` and `iat` checks.
pub const DEFAULT_CLOCK_TOLERANCE: Duration = Duration::from_secs(60);

/// Maximum allowed clock tolerance (10 minutes).
///
/// Configuration above this value is rejected.
pub const MAX_CLOCK_TOLERANCE: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT outside of signature verification.
///
/// Display strings follow the wording commonly used by JWT libraries so that
/// detailed rejection messages stay familiar to integrators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// No token was presented.
    #[error("jwt must be provided")]
    EmptyToken,

    /// Token size exceeds maximum allowed.
    #[error("jwt too large")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("jwt malformed")]
    MalformedToken,

    /// Token header does not carry an `alg` string.
    #[error("jwt header is missing alg")]
    MissingAlgorithm,

    /// Token `exp` is in the past (after tolerance).
    #[error("jwt expired")]
    Expired,

    /// Token `nbf` is in the future (after tolerance).
    #[error("jwt not active")]
    NotYetValid,

    /// Token `iat` claim is too far in the future.
    #[error("jwt issued in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `alg` from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The returned value is only suitable for rejecting unexpected algorithms;
///   the token MUST still be verified with a pinned algorithm afterwards
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `EmptyToken` - Token is the empty string
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Token format invalid (wrong structure, bad base64, invalid JSON)
/// - `MissingAlgorithm` - Header has no `alg` string
pub fn extract_alg(token: &str) -> Result<String, JwtValidationError> {
    if token.is_empty() {
        return Err(JwtValidationError::EmptyToken);
    }

    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingAlgorithm)
}

/// Validate the `exp` (expiration) claim against `now` with clock tolerance.
///
/// A token is expired once `now >= exp + tolerance`.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` if the token is past its expiry.
pub fn validate_exp_at(exp: i64, tolerance: Duration, now: i64) -> Result<(), JwtValidationError> {
    let tolerance_secs = tolerance_secs(tolerance);

    if now >= exp.saturating_add(tolerance_secs) {
        tracing::debug!(
            target: "common.jwt",
            exp = exp,
            now = now,
            tolerance_secs = tolerance_secs,
            "Token rejected: expired"
        );
        return Err(JwtValidationError::Expired);
    }

    Ok(())
}

/// Validate the optional `nbf` (not before) claim against `now` with clock tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::NotYetValid` if `nbf > now + tolerance`.
pub fn validate_nbf_at(nbf: i64, tolerance: Duration, now: i64) -> Result<(), JwtValidationError> {
    let tolerance_secs = tolerance_secs(tolerance);

    if nbf > now.saturating_add(tolerance_secs) {
        tracing::debug!(
            target: "common.jwt",
            nbf = nbf,
            now = now,
            tolerance_secs = tolerance_secs,
            "Token rejected: not yet valid"
        );
        return Err(JwtValidationError::NotYetValid);
    }

    Ok(())
}

/// Validate the `iat` (issued-at) claim against `now` with clock tolerance.
///
/// Rejects tokens with `iat` more than `tolerance` in the future, which points
/// at pre-generated tokens or a badly skewed issuer clock.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + tolerance`.
pub fn validate_iat_at(iat: i64, tolerance: Duration, now: i64) -> Result<(), JwtValidationError> {
    let tolerance_secs = tolerance_secs(tolerance);
    let max_iat = now.saturating_add(tolerance_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            tolerance_secs = tolerance_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

fn tolerance_secs(tolerance: Duration) -> i64 {
    i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX)
}

// =============================================================================
// Tests
// =============================================================================
