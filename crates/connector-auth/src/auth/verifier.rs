//! Identity token verification.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The header algorithm is checked before any cryptographic work; only RS256
//!   is accepted
//! - The audience must equal the externally visible URL of the request
//! - `exp`, `nbf` and `iat` are checked against the injected clock with the
//!   configured tolerance

use crate::auth::claims::IdentityClaims;
use crate::auth::key_cache::SigningKey;
use crate::clock::Clock;
use crate::errors::AuthError;
use common::jwt::{extract_alg, validate_exp_at, validate_iat_at, validate_nbf_at};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The only accepted signing algorithm.
const ACCEPTED_ALGORITHM: &str = "RS256";

/// Verifies bearer tokens against a signing key.
pub struct TokenVerifier {
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Verify `token` and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size and structure check, header `alg` must be RS256
    /// 2. RS256 signature against `key`
    /// 3. `aud` equals `expected_audience`
    /// 4. Required identity claims present and well typed
    /// 5. `exp`, `nbf`, `iat` within `clock_tolerance` of now
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken`, `AlgorithmRejected`, `SignatureInvalid`,
    /// `AudienceMismatch` or `Expired`. No partial claims are returned.
    #[instrument(skip_all, fields(audience = %expected_audience))]
    pub fn verify(
        &self,
        token: &str,
        key: &SigningKey,
        expected_audience: &str,
        clock_tolerance: Duration,
    ) -> Result<IdentityClaims, AuthError> {
        let alg = extract_alg(token).map_err(|e| {
            tracing::debug!(target: "auth.verifier", error = %e, "Token header inspection failed");
            AuthError::MalformedToken(e.to_string())
        })?;

        if alg != ACCEPTED_ALGORITHM {
            tracing::warn!(target: "auth.verifier", alg = %alg, "Token algorithm rejected");
            return Err(AuthError::AlgorithmRejected(alg));
        }

        let payload = decode_payload(token, key, expected_audience)?;

        let claims = IdentityClaims::from_raw(payload).map_err(|e| {
            tracing::debug!(target: "auth.verifier", error = %e, "Token claims incomplete");
            AuthError::MalformedToken(format!("jwt claims invalid: {e}"))
        })?;

        let now = self.clock.now().timestamp();
        let expired = |e: common::jwt::JwtValidationError| AuthError::Expired(e.to_string());

        validate_exp_at(claims.exp, clock_tolerance, now).map_err(expired)?;
        if let Some(nbf) = claims.nbf {
            validate_nbf_at(nbf, clock_tolerance, now).map_err(expired)?;
        }
        validate_iat_at(claims.iat, clock_tolerance, now).map_err(expired)?;

        tracing::debug!(target: "auth.verifier", "Token validated successfully");
        Ok(claims)
    }
}

/// Verify the signature and audience, returning the raw payload.
///
/// Time claims are left to the caller so they are checked against the injected
/// clock rather than the system time.
fn decode_payload(
    token: &str,
    key: &SigningKey,
    expected_audience: &str,
) -> Result<Map<String, Value>, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.set_required_spec_claims(&["exp", "aud"]);
    validation.set_audience(&[expected_audience]);

    decode::<Map<String, Value>>(token, key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "auth.verifier", error = %e, "Token verification failed");
            map_decode_error(e.kind(), expected_audience)
        })
}

fn map_decode_error(kind: &ErrorKind, expected_audience: &str) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            AuthError::SignatureInvalid
        }
        ErrorKind::InvalidAlgorithm => AuthError::AlgorithmRejected(ACCEPTED_ALGORITHM.to_string()),
        ErrorKind::InvalidAudience => AuthError::AudienceMismatch {
            expected: expected_audience.to_string(),
        },
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => AuthError::AudienceMismatch {
            expected: expected_audience.to_string(),
        },
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::MalformedToken(format!("jwt claim missing: {claim}"))
        }
        ErrorKind::ExpiredSignature => AuthError::Expired("jwt expired".to_string()),
        ErrorKind::ImmatureSignature => AuthError::Expired("jwt not active".to_string()),
        _ => AuthError::MalformedToken("jwt malformed".to_string()),
    }
}
