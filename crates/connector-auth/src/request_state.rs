//! Request-scoped state.
//!
//! Middleware stages each contribute part of a [`RequestState`]: request id
//! propagation seeds the correlation id, backend and routing headers add the
//! connector's upstream context, authentication adds the caller's identity.
//! Contributions are combined through [`contribute`] only.

use crate::auth::identity::IdentityContext;
use axum::http::Extensions;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// State accumulated for one request.
#[derive(Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idm_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_hire: Option<bool>,
    /// Admin-configured base URL of the backend system (`X-Connector-Base-Url`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_base_url: Option<String>,
    /// Credential for the backend system (`X-Connector-Authorization`). Never
    /// serialized or logged.
    #[serde(skip)]
    pub backend_authorization: Option<String>,
    /// Mobile Flows routing prefix with this connector's context path appended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mf_routing_prefix: Option<String>,
    /// Mobile Flows routing template with this connector's context path appended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mf_routing_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<Value>,
}

impl RequestState {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Self::default()
        }
    }

    /// Combine with a later contribution. Fields set in `later` win; fields it
    /// leaves unset keep their current value.
    #[must_use]
    pub fn merge(self, later: RequestState) -> RequestState {
        RequestState {
            request_id: later.request_id.or(self.request_id),
            tenant_id: later.tenant_id.or(self.tenant_id),
            username: later.username.or(self.username),
            email: later.email.or(self.email),
            idm_domain: later.idm_domain.or(self.idm_domain),
            pre_hire: later.pre_hire.or(self.pre_hire),
            backend_base_url: later.backend_base_url.or(self.backend_base_url),
            backend_authorization: later.backend_authorization.or(self.backend_authorization),
            mf_routing_prefix: later.mf_routing_prefix.or(self.mf_routing_prefix),
            mf_routing_template: later.mf_routing_template.or(self.mf_routing_template),
            decoded: later.decoded.or(self.decoded),
        }
    }
}

/// Merge `later` into the state stored in `extensions`, creating it if absent.
///
/// Returns the merged state, which is also left in `extensions`.
pub fn contribute(extensions: &mut Extensions, later: RequestState) -> RequestState {
    let merged = extensions
        .remove::<RequestState>()
        .unwrap_or_default()
        .merge(later);
    extensions.insert(merged.clone());
    merged
}

impl From<IdentityContext> for RequestState {
    fn from(identity: IdentityContext) -> Self {
        Self {
            request_id: None,
            tenant_id: Some(identity.tenant_id),
            username: Some(identity.username),
            email: Some(identity.email),
            idm_domain: Some(identity.idm_domain),
            pre_hire: identity.pre_hire,
            decoded: Some(identity.decoded),
            ..Self::default()
        }
    }
}

impl fmt::Debug for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestState")
            .field("request_id", &self.request_id)
            .field("tenant_id", &self.tenant_id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("idm_domain", &self.idm_domain)
            .field("pre_hire", &self.pre_hire)
            .field("backend_base_url", &self.backend_base_url)
            .field(
                "backend_authorization",
                &self.backend_authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .field("mf_routing_prefix", &self.mf_routing_prefix)
            .field("mf_routing_template", &self.mf_routing_template)
            .field("decoded", &self.decoded.is_some())
            .finish()
    }
}

/// Log prefix with the correlation fields that are known, e.g.
/// `[req: gen-1] [t: tenant123] [u: shree] `.
impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labelled = [
            ("req", self.request_id.as_deref()),
            ("t", self.tenant_id.as_deref()),
            ("u", self.username.as_deref()),
            ("e", self.email.as_deref()),
            ("base", self.backend_base_url.as_deref()),
        ];
        for (label, value) in labelled {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                write!(f, "[{label}: {value}] ")?;
            }
        }
        if let Some(pre_hire) = self.pre_hire {
            write!(f, "[ph: {pre_hire}] ")?;
        }
        Ok(())
    }
}
