//! Identity context derived from verified claims.

use crate::auth::claims::IdentityClaims;
use serde::Serialize;
use serde_json::Value;

/// The caller's identity, attached to each authenticated request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityContext {
    pub tenant_id: String,
    pub username: String,
    pub email: String,
    pub idm_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_hire: Option<bool>,
    /// The full decoded claim set.
    pub decoded: Value,
}

impl IdentityContext {
    pub fn build(claims: &IdentityClaims) -> Self {
        Self {
            tenant_id: claims.tenant.clone(),
            username: username_from_principal(&claims.prn).to_string(),
            email: claims.eml.clone(),
            idm_domain: claims.domain.clone(),
            pre_hire: claims.pre_hire,
            decoded: claims.raw().clone(),
        }
    }
}

/// The part of a principal before its last `@`, or the whole principal when it
/// has none.
pub fn username_from_principal(principal: &str) -> &str {
    principal
        .rsplit_once('@')
        .map_or(principal, |(username, _)| username)
}
