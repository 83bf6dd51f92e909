//! Identity token claims.
//!
//! The principal and email are redacted in Debug output to keep them out of logs.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Claims carried by a verified identity token.
///
/// Unrecognized claims (including `aud`) land in `extra`; the complete claim set
/// is kept in `raw`.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Principal, conventionally `user@domain`.
    pub prn: String,

    /// Tenant identifier.
    pub tenant: String,

    /// Email address.
    pub eml: String,

    /// Identity manager domain.
    pub domain: String,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(deserialize_with = "numeric_date")]
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(deserialize_with = "numeric_date")]
    pub exp: i64,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(
        default,
        deserialize_with = "optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub nbf: Option<i64>,

    /// Pre-hire flag. Absent is not the same as `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_hire: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(skip)]
    raw: Value,
}

impl IdentityClaims {
    /// Build claims from a decoded payload.
    ///
    /// # Errors
    ///
    /// Fails if a required claim is missing or has the wrong type.
    pub fn from_raw(payload: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let raw = Value::Object(payload);
        let mut claims: IdentityClaims = serde_json::from_value(raw.clone())?;
        claims.raw = raw;
        Ok(claims)
    }

    /// The full decoded payload.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Whole seconds of a NumericDate, which may be fractional.
///
/// Fractions round up, so `now >= exp` and `nbf > now` give the same answer for
/// whole-second `now` as they would on the exact value.
fn numeric_date_seconds(number: &Number) -> Option<i64> {
    if let Some(seconds) = number.as_i64() {
        return Some(seconds);
    }
    let seconds = number.as_f64()?.ceil();
    let in_range = seconds.is_finite() && seconds >= i64::MIN as f64 && seconds < i64::MAX as f64;
    in_range.then_some(seconds as i64)
}

fn to_seconds<E: serde::de::Error>(number: &Number) -> Result<i64, E> {
    numeric_date_seconds(number)
        .ok_or_else(|| E::custom(format!("NumericDate out of range: {number}")))
}

fn numeric_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    to_seconds(&Number::deserialize(deserializer)?)
}

fn optional_numeric_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Option::<Number>::deserialize(deserializer)?
        .as_ref()
        .map(to_seconds)
        .transpose()
}

impl fmt::Debug for IdentityClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClaims")
            .field("prn", &"[REDACTED]")
            .field("tenant", &self.tenant)
            .field("eml", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("pre_hire", &self.pre_hire)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn full_payload() -> Value {
        json!({
            "prn": "shree@vmware.com",
            "tenant": "tenant123",
            "eml": "shree@vmware.com",
            "domain": "vmware.com",
            "iat": 1_700_000_000,
            "exp": 1_700_003_600,
            "aud": "https://my-host/action",
            "pre_hire": true,
            "custom": {"team": "mobile"}
        })
    }

    #[test]
    fn test_from_raw_reads_known_claims() {
        let claims = IdentityClaims::from_raw(payload(full_payload())).unwrap();

        assert_eq!(claims.prn, "shree@vmware.com");
        assert_eq!(claims.tenant, "tenant123");
        assert_eq!(claims.eml, "shree@vmware.com");
        assert_eq!(claims.domain, "vmware.com");
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_003_600);
        assert_eq!(claims.nbf, None);
        assert_eq!(claims.pre_hire, Some(true));
    }

    #[test]
    fn test_unknown_claims_go_to_extra() {
        let claims = IdentityClaims::from_raw(payload(full_payload())).unwrap();

        assert_eq!(claims.extra.get("aud"), Some(&json!("https://my-host/action")));
        assert_eq!(claims.extra.get("custom"), Some(&json!({"team": "mobile"})));
        assert!(!claims.extra.contains_key("prn"));
    }

    #[test]
    fn test_raw_keeps_complete_payload() {
        let claims = IdentityClaims::from_raw(payload(full_payload())).unwrap();
        assert_eq!(claims.raw(), &full_payload());
    }

    #[test]
    fn test_missing_required_claim_is_error() {
        let mut value = full_payload();
        value.as_object_mut().unwrap().remove("tenant");

        assert!(IdentityClaims::from_raw(payload(value)).is_err());
    }

    #[test]
    fn test_mistyped_claim_is_error() {
        let mut value = full_payload();
        value["exp"] = json!("tomorrow");

        assert!(IdentityClaims::from_raw(payload(value)).is_err());
    }

    #[test]
    fn test_fractional_numeric_dates_round_up() {
        let mut value = full_payload();
        value["iat"] = json!(1_700_000_000.25);
        value["exp"] = json!(1_700_003_600.5);
        value["nbf"] = json!(1_699_999_999.9);

        let claims = IdentityClaims::from_raw(payload(value)).unwrap();
        assert_eq!(claims.iat, 1_700_000_001);
        assert_eq!(claims.exp, 1_700_003_601);
        assert_eq!(claims.nbf, Some(1_700_000_000));
    }

    #[test]
    fn test_negative_fraction_rounds_toward_zero() {
        let mut value = full_payload();
        value["nbf"] = json!(-0.5);

        let claims = IdentityClaims::from_raw(payload(value)).unwrap();
        assert_eq!(claims.nbf, Some(0));
    }

    #[test]
    fn test_out_of_range_numeric_date_is_error() {
        let mut value = full_payload();
        value["exp"] = json!(1e300);

        assert!(IdentityClaims::from_raw(payload(value)).is_err());
    }

    #[test]
    fn test_absent_pre_hire_is_none() {
        let mut value = full_payload();
        value.as_object_mut().unwrap().remove("pre_hire");

        let claims = IdentityClaims::from_raw(payload(value)).unwrap();
        assert_eq!(claims.pre_hire, None);
    }

    #[test]
    fn test_debug_redacts_principal_and_email() {
        let claims = IdentityClaims::from_raw(payload(full_payload())).unwrap();
        let debug_str = format!("{:?}", claims);

        assert!(
            !debug_str.contains("shree@vmware.com"),
            "Debug output should not contain principal or email"
        );
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("tenant123"));
    }
}
