//! Signing key cache.
//!
//! Holds at most one signing key, the one fetched from the configured source URL.
//! An entry is served until `expires_at`; the first `get` at or after that instant
//! fetches a fresh copy and replaces it. Concurrent misses share one fetch.
//!
//! # Security
//!
//! - Key material that does not parse as an RSA public key is never cached
//! - A failed fetch leaves the previous entry in place but does not serve it
//!   past its expiry

use crate::auth::key_source::SigningKeySource;
use crate::clock::Clock;
use crate::errors::AuthError;
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL (1 hour).
pub const DEFAULT_KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Reason given when no key source URL is configured.
pub const MISSING_KEY_URL_MESSAGE: &str = "Please provide the signing key URL (MF_PUB_KEY_URL)";

/// A fetched signing key.
///
/// Immutable once built; the cache replaces it rather than updating it.
#[derive(Clone)]
pub struct SigningKey {
    source_url: String,
    material: String,
    decoding_key: DecodingKey,
    fetched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SigningKey {
    /// Parse PEM key material fetched from `source_url` at `fetched_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyFetch` if the material is not an RSA public key.
    /// Returns `AuthError::Configuration` if `ttl` cannot be represented.
    pub fn from_pem(
        source_url: &str,
        material: String,
        fetched_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, AuthError> {
        let decoding_key = DecodingKey::from_rsa_pem(material.as_bytes()).map_err(|e| {
            AuthError::KeyFetch(format!("signing key is not a valid RSA public key: {e}"))
        })?;

        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| fetched_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::Configuration(format!("key cache TTL out of range: {ttl:?}"))
            })?;

        Ok(Self {
            source_url: source_url.to_string(),
            material,
            decoding_key,
            fetched_at,
            expires_at,
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The PEM text as served by the source.
    pub fn material(&self) -> &str {
        &self.material
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the key may still be served at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("source_url", &self.source_url)
            .field("material_len", &self.material.len())
            .field("fetched_at", &self.fetched_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// TTL cache in front of a [`SigningKeySource`].
pub struct KeyCache {
    source: Arc<dyn SigningKeySource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entry: RwLock<Option<Arc<SigningKey>>>,
    /// Serializes refreshes so concurrent misses trigger one fetch.
    refresh_lock: Mutex<()>,
}

impl KeyCache {
    pub fn new(source: Arc<dyn SigningKeySource>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(source, clock, DEFAULT_KEY_CACHE_TTL)
    }

    pub fn with_ttl(
        source: Arc<dyn SigningKeySource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            ttl,
            entry: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return the current signing key for `source_url`, fetching it if the cached
    /// entry is missing, expired, or from another URL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if `source_url` is missing or empty.
    /// No fetch is attempted in that case.
    /// Returns `AuthError::KeyFetch` if the key cannot be fetched or parsed.
    #[instrument(skip(self))]
    pub async fn get(&self, source_url: Option<&str>) -> Result<Arc<SigningKey>, AuthError> {
        let url = match source_url.map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => {
                tracing::warn!(target: "auth.key_cache", "No signing key URL configured");
                return Err(AuthError::Configuration(MISSING_KEY_URL_MESSAGE.to_string()));
            }
        };

        if let Some(key) = self.cached(url).await {
            tracing::debug!(target: "auth.key_cache", source_url = %url, "Signing key cache hit");
            return Ok(key);
        }

        let _refresh_guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(key) = self.cached(url).await {
            tracing::debug!(target: "auth.key_cache", source_url = %url, "Signing key refreshed by concurrent request");
            return Ok(key);
        }

        self.refresh(url).await
    }

    /// The entry currently held, fresh or not.
    pub async fn peek(&self) -> Option<Arc<SigningKey>> {
        self.entry.read().await.clone()
    }

    async fn cached(&self, url: &str) -> Option<Arc<SigningKey>> {
        let now = self.clock.now();
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|key| key.source_url == url && key.is_fresh_at(now))
            .cloned()
    }

    async fn refresh(&self, url: &str) -> Result<Arc<SigningKey>, AuthError> {
        let material = match self.source.fetch(url).await {
            Ok(material) => material,
            Err(e) => {
                metrics::record_key_refresh("error");
                return Err(e);
            }
        };

        let key = match SigningKey::from_pem(url, material, self.clock.now(), self.ttl) {
            Ok(key) => Arc::new(key),
            Err(e) => {
                tracing::error!(target: "auth.key_cache", source_url = %url, error = %e, "Fetched signing key is unusable");
                metrics::record_key_refresh("error");
                return Err(e);
            }
        };

        tracing::info!(
            target: "auth.key_cache",
            source_url = %url,
            expires_at = %key.expires_at.to_rfc3339(),
            "Updated signing key cache"
        );
        metrics::record_key_refresh("success");

        *self.entry.write().await = Some(Arc::clone(&key));
        Ok(key)
    }
}
