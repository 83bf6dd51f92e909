//! Mobile Flows routing headers.
//!
//! The platform sends `X-Routing-Prefix` and `X-Routing-Template` so a connector
//! can build URLs that route back to it. When the connector is hosted behind a
//! path based proxy, its context path (`X-Forwarded-Prefix`) must be appended to
//! both.

use crate::middleware::forwarded::{header_str, X_FORWARDED_PREFIX};
use crate::request_state::{contribute, RequestState};
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

pub const X_ROUTING_PREFIX: &str = "x-routing-prefix";
pub const X_ROUTING_TEMPLATE: &str = "x-routing-template";

/// Context path of this connector: `/my-path-prefix` becomes `my-path-prefix/`.
fn context_path(headers: &HeaderMap) -> String {
    header_str(headers, X_FORWARDED_PREFIX).map_or_else(String::new, |prefix| {
        format!("{}/", prefix.strip_prefix('/').unwrap_or(prefix))
    })
}

/// Routing prefix and template with the context path appended. Either is `None`
/// when its header is absent.
pub fn routing_state(headers: &HeaderMap) -> RequestState {
    let context_path = context_path(headers);
    let with_context = |name: &str| {
        header_str(headers, name).map(|value| format!("{value}{context_path}"))
    };

    RequestState {
        mf_routing_prefix: with_context(X_ROUTING_PREFIX),
        mf_routing_template: with_context(X_ROUTING_TEMPLATE),
        ..RequestState::default()
    }
}

/// Middleware that records the routing prefix and template in [`RequestState`].
pub async fn add_context_path(mut req: Request, next: Next) -> Response {
    let routing = routing_state(req.headers());
    contribute(req.extensions_mut(), routing);
    next.run(req).await
}
