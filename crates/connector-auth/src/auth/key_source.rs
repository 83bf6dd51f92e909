//! Signing key retrieval.
//!
//! The issuer publishes a single PEM encoded RSA public key at a fixed URL. A
//! [`SigningKeySource`] returns that key material as text; caching is the job of
//! [`KeyCache`](super::key_cache::KeyCache).

use crate::errors::AuthError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// Fetches raw signing key material.
#[async_trait]
pub trait SigningKeySource: Send + Sync {
    /// Return the PEM text served at `url`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyFetch` if the key cannot be retrieved.
    async fn fetch(&self, url: &str) -> Result<String, AuthError>;
}

/// HTTP backed key source.
pub struct HttpKeySource {
    http_client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a key source whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "auth.key_source", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { http_client }
    }
}

#[async_trait]
impl SigningKeySource for HttpKeySource {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<String, AuthError> {
        tracing::debug!(target: "auth.key_source", url = %url, "Fetching signing key");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::error!(target: "auth.key_source", url = %url, error = %e, "Failed to fetch signing key");
            AuthError::KeyFetch(format!("failed to fetch signing key: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "auth.key_source",
                url = %url,
                status = %status,
                "Signing key endpoint returned error"
            );
            return Err(AuthError::KeyFetch(format!(
                "signing key endpoint returned {status}"
            )));
        }

        response.text().await.map_err(|e| {
            tracing::error!(target: "auth.key_source", url = %url, error = %e, "Failed to read signing key body");
            AuthError::KeyFetch(format!("failed to read signing key: {e}"))
        })
    }
}
