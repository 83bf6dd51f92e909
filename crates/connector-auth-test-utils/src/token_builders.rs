//! Builder patterns for test tokens
//!
//! Provides a fluent API for identity claims and signed RS256 tokens.

use crate::crypto_fixtures::TEST_RSA_PRIVATE_KEY;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for identity tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_principal("shree@vmware.com")
///     .audience("https://my-host:3030/my-path-prefix/action-one")
///     .sign();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    private_key: &'static str,
}

impl TestTokenBuilder {
    /// Create a builder with a complete claim set issued now and valid for an hour.
    pub fn new() -> Self {
        Self::issued_at_time(Utc::now())
    }

    /// Create a builder whose `iat` is `now` and `exp` one hour later.
    pub fn issued_at_time(now: DateTime<Utc>) -> Self {
        let claims = json!({
            "prn": "shree@vmware.com",
            "tenant": "tenant123",
            "eml": "shree@vmware.com",
            "domain": "vmware.com",
            "iat": now.timestamp(),
            "exp": (now + Duration::seconds(3600)).timestamp(),
        });
        Self {
            claims: claims.as_object().cloned().unwrap_or_default(),
            private_key: TEST_RSA_PRIVATE_KEY,
        }
    }

    /// Set the principal (`prn`)
    pub fn for_principal(self, prn: &str) -> Self {
        self.claim("prn", json!(prn))
    }

    pub fn tenant(self, tenant: &str) -> Self {
        self.claim("tenant", json!(tenant))
    }

    pub fn email(self, email: &str) -> Self {
        self.claim("eml", json!(email))
    }

    pub fn domain(self, domain: &str) -> Self {
        self.claim("domain", json!(domain))
    }

    /// Set the audience (`aud`), the URL the token may be presented to
    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    pub fn pre_hire(self, pre_hire: bool) -> Self {
        self.claim("pre_hire", json!(pre_hire))
    }

    pub fn issued_at(self, at: DateTime<Utc>) -> Self {
        self.claim("iat", json!(at.timestamp()))
    }

    pub fn expires_at(self, at: DateTime<Utc>) -> Self {
        self.claim("exp", json!(at.timestamp()))
    }

    pub fn not_before(self, at: DateTime<Utc>) -> Self {
        self.claim("nbf", json!(at.timestamp()))
    }

    /// Set an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim from the set
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Sign with a different private key (PKCS#1 PEM)
    pub fn signed_with(mut self, private_key: &'static str) -> Self {
        self.private_key = private_key;
        self
    }

    /// Build the claims as a JSON value
    pub fn build_claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign the claims with RS256
    pub fn sign(&self) -> String {
        self.sign_with_algorithm(Algorithm::RS256)
    }

    /// Sign the claims with another RSA algorithm (RS384, RS512, PS256, ...)
    pub fn sign_with_algorithm(&self, algorithm: Algorithm) -> String {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .expect("test private key must be a valid RSA PEM");
        encode(&Header::new(algorithm), &self.claims, &key).expect("failed to sign test token")
    }

    /// Encode the claims as an unsigned `alg: none` token
    pub fn unsigned(&self) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&self.claims).expect("claims serialize to JSON"));
        format!("{}.{}.", header, payload)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
