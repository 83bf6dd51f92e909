//! Connector authentication configuration.
//!
//! Configuration is loaded from environment variables. The signing key URL is
//! optional at load time: a missing URL does not stop the service from starting,
//! it makes every authenticated request fail with a configuration error.

use common::jwt::{DEFAULT_CLOCK_TOLERANCE, MAX_CLOCK_TOLERANCE};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default signing key cache TTL in seconds (1 hour).
pub const DEFAULT_KEY_CACHE_TTL_SECONDS: u64 = 3600;

/// Largest accepted signing key cache TTL in seconds (30 days).
pub const MAX_KEY_CACHE_TTL_SECONDS: u64 = 30 * 24 * 3600;

/// Default timeout for a signing key fetch in seconds.
pub const DEFAULT_KEY_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Largest accepted signing key fetch timeout in seconds.
pub const MAX_KEY_FETCH_TIMEOUT_SECONDS: u64 = 300;

/// How much of a failure reason is exposed in rejection messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorDetail {
    /// Include the failure reason (e.g. `jwt expired`).
    #[default]
    Detailed,
    /// Return one fixed message for every failure.
    Generic,
}

impl FromStr for ErrorDetail {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detailed" => Ok(ErrorDetail::Detailed),
            "generic" => Ok(ErrorDetail::Generic),
            other => Err(ConfigError::InvalidErrorDetail(format!(
                "AUTH_ERROR_DETAIL must be 'detailed' or 'generic', got '{}'",
                other
            ))),
        }
    }
}

/// Settings for the authentication middleware.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// URL serving the issuer's PEM encoded public key.
    pub key_url: Option<String>,

    /// Tolerated clock difference between issuer and verifier.
    pub clock_tolerance: Duration,

    /// How long a fetched key is trusted before it is fetched again.
    pub key_cache_ttl: Duration,

    /// Request timeout for a key fetch.
    pub key_fetch_timeout: Duration,

    /// Rejection message detail.
    pub error_detail: ErrorDetail,
}

impl AuthConfig {
    /// Configuration with defaults for everything but the key URL.
    pub fn new(key_url: Option<String>) -> Self {
        Self {
            key_url,
            clock_tolerance: DEFAULT_CLOCK_TOLERANCE,
            key_cache_ttl: Duration::from_secs(DEFAULT_KEY_CACHE_TTL_SECONDS),
            key_fetch_timeout: Duration::from_secs(DEFAULT_KEY_FETCH_TIMEOUT_SECONDS),
            error_detail: ErrorDetail::default(),
        }
    }
}

/// Service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// Authentication settings.
    pub auth: AuthConfig,

    /// Disable all log output (`SQUELCH_LOGS` set to any value).
    pub squelch_logs: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("key_url", &self.auth.key_url)
            .field("clock_tolerance", &self.auth.clock_tolerance)
            .field("key_cache_ttl", &self.auth.key_cache_ttl)
            .field("key_fetch_timeout", &self.auth.key_fetch_timeout)
            .field("error_detail", &self.auth.error_detail)
            .field("squelch_logs", &self.squelch_logs)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid clock tolerance configuration: {0}")]
    InvalidClockTolerance(String),

    #[error("Invalid key cache TTL configuration: {0}")]
    InvalidKeyCacheTtl(String),

    #[error("Invalid key fetch timeout configuration: {0}")]
    InvalidKeyFetchTimeout(String),

    #[error("Invalid error detail configuration: {0}")]
    InvalidErrorDetail(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let key_url = vars
            .get("MF_PUB_KEY_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let clock_tolerance = match vars.get("AUTH_CLOCK_TOLERANCE_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidClockTolerance(format!(
                        "AUTH_CLOCK_TOLERANCE_SECONDS must be a non-negative integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                let tolerance = Duration::from_secs(value);
                if tolerance > MAX_CLOCK_TOLERANCE {
                    return Err(ConfigError::InvalidClockTolerance(format!(
                        "AUTH_CLOCK_TOLERANCE_SECONDS must not exceed {} seconds, got {}",
                        MAX_CLOCK_TOLERANCE.as_secs(),
                        value
                    )));
                }
                tolerance
            }
            None => DEFAULT_CLOCK_TOLERANCE,
        };

        let key_cache_ttl = parse_bounded_seconds(
            vars,
            "KEY_CACHE_TTL_SECONDS",
            DEFAULT_KEY_CACHE_TTL_SECONDS,
            MAX_KEY_CACHE_TTL_SECONDS,
            ConfigError::InvalidKeyCacheTtl,
        )?;

        let key_fetch_timeout = parse_bounded_seconds(
            vars,
            "KEY_FETCH_TIMEOUT_SECONDS",
            DEFAULT_KEY_FETCH_TIMEOUT_SECONDS,
            MAX_KEY_FETCH_TIMEOUT_SECONDS,
            ConfigError::InvalidKeyFetchTimeout,
        )?;

        let error_detail = match vars.get("AUTH_ERROR_DETAIL") {
            Some(value) => value.parse()?,
            None => ErrorDetail::default(),
        };

        let squelch_logs = vars.contains_key("SQUELCH_LOGS");

        Ok(Config {
            bind_address,
            auth: AuthConfig {
                key_url,
                clock_tolerance,
                key_cache_ttl,
                key_fetch_timeout,
                error_detail,
            },
            squelch_logs,
        })
    }
}

/// Parse `name` as whole seconds in `1..=max`.
fn parse_bounded_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    max: u64,
    to_error: fn(String) -> ConfigError,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        to_error(format!(
            "{} must be a positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(to_error(format!("{} must be positive, got 0", name)));
    }

    if value > max {
        return Err(to_error(format!(
            "{} must not exceed {} seconds, got {}",
            name, max, value
        )));
    }

    Ok(Duration::from_secs(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&HashMap::new()).unwrap();

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.auth.key_url, None);
        assert_eq!(config.auth.clock_tolerance, Duration::from_secs(60));
        assert_eq!(config.auth.key_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.auth.key_fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.auth.error_detail, ErrorDetail::Detailed);
        assert!(!config.squelch_logs);
    }

    #[test]
    fn test_missing_key_url_is_not_a_load_error() {
        let config = Config::from_vars(&vars(&[("MF_PUB_KEY_URL", "   ")])).unwrap();
        assert_eq!(config.auth.key_url, None);
    }

    #[test]
    fn test_all_values_from_vars() {
        let config = Config::from_vars(&vars(&[
            ("BIND_ADDRESS", "127.0.0.1:4000"),
            ("MF_PUB_KEY_URL", "https://issuer.example.com/security/public-key"),
            ("AUTH_CLOCK_TOLERANCE_SECONDS", "30"),
            ("KEY_CACHE_TTL_SECONDS", "120"),
            ("KEY_FETCH_TIMEOUT_SECONDS", "3"),
            ("AUTH_ERROR_DETAIL", "generic"),
            ("SQUELCH_LOGS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:4000");
        assert_eq!(
            config.auth.key_url.as_deref(),
            Some("https://issuer.example.com/security/public-key")
        );
        assert_eq!(config.auth.clock_tolerance, Duration::from_secs(30));
        assert_eq!(config.auth.key_cache_ttl, Duration::from_secs(120));
        assert_eq!(config.auth.key_fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.auth.error_detail, ErrorDetail::Generic);
        assert!(config.squelch_logs);
    }

    #[test]
    fn test_zero_clock_tolerance_is_allowed() {
        let config =
            Config::from_vars(&vars(&[("AUTH_CLOCK_TOLERANCE_SECONDS", "0")])).unwrap();
        assert_eq!(config.auth.clock_tolerance, Duration::ZERO);
    }

    #[test]
    fn test_clock_tolerance_above_max_is_rejected() {
        let result = Config::from_vars(&vars(&[("AUTH_CLOCK_TOLERANCE_SECONDS", "601")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidClockTolerance(msg)) if msg.contains("must not exceed")
        ));
    }

    #[test]
    fn test_non_numeric_clock_tolerance_is_rejected() {
        let result = Config::from_vars(&vars(&[("AUTH_CLOCK_TOLERANCE_SECONDS", "soon")]));
        assert!(matches!(result, Err(ConfigError::InvalidClockTolerance(_))));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let result = Config::from_vars(&vars(&[("KEY_CACHE_TTL_SECONDS", "0")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidKeyCacheTtl(msg)) if msg.contains("must be positive")
        ));
    }

    #[test]
    fn test_ttl_above_max_is_rejected_at_load() {
        let too_long = u64::MAX.to_string();
        let result = Config::from_vars(&vars(&[("KEY_CACHE_TTL_SECONDS", too_long.as_str())]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidKeyCacheTtl(msg)) if msg.contains("must not exceed")
        ));
    }

    #[test]
    fn test_max_ttl_is_accepted_and_usable() {
        let max = MAX_KEY_CACHE_TTL_SECONDS.to_string();
        let config = Config::from_vars(&vars(&[("KEY_CACHE_TTL_SECONDS", max.as_str())])).unwrap();

        assert_eq!(
            config.auth.key_cache_ttl,
            Duration::from_secs(MAX_KEY_CACHE_TTL_SECONDS)
        );
        assert!(chrono::Duration::from_std(config.auth.key_cache_ttl)
            .ok()
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .is_some());
    }

    #[test]
    fn test_fetch_timeout_above_max_is_rejected() {
        let result = Config::from_vars(&vars(&[("KEY_FETCH_TIMEOUT_SECONDS", "301")]));
        assert!(matches!(result, Err(ConfigError::InvalidKeyFetchTimeout(_))));
    }

    #[test]
    fn test_invalid_fetch_timeout_is_rejected() {
        let result = Config::from_vars(&vars(&[("KEY_FETCH_TIMEOUT_SECONDS", "-1")]));
        assert!(matches!(result, Err(ConfigError::InvalidKeyFetchTimeout(_))));
    }

    #[test]
    fn test_error_detail_parsing() {
        assert_eq!("Detailed".parse::<ErrorDetail>().unwrap(), ErrorDetail::Detailed);
        assert_eq!(" generic ".parse::<ErrorDetail>().unwrap(), ErrorDetail::Generic);
        assert!(matches!(
            "verbose".parse::<ErrorDetail>(),
            Err(ConfigError::InvalidErrorDetail(_))
        ));
    }

    #[test]
    fn test_auth_config_new_uses_defaults() {
        let auth = AuthConfig::new(Some("http://localhost/key".to_string()));
        assert_eq!(auth.clock_tolerance, DEFAULT_CLOCK_TOLERANCE);
        assert_eq!(auth.key_cache_ttl, Duration::from_secs(3600));
        assert_eq!(auth.error_detail, ErrorDetail::Detailed);
    }
}
