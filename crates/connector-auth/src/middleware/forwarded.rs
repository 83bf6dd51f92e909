//! Externally visible request URL.
//!
//! Behind a reverse proxy the request URI only carries the local path, so the
//! URL a client actually called is rebuilt from `X-Forwarded-*` headers.

use axum::http::{header, HeaderMap, Uri};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PORT: &str = "x-forwarded-port";
pub(crate) const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Base URL of this service as seen by the caller.
///
/// - scheme from `X-Forwarded-Proto`, default `http`
/// - `X-Forwarded-Host` plus `X-Forwarded-Port` when both are present
/// - `X-Forwarded-Host` alone otherwise
/// - the `Host` header when no forwarded host is given
///
/// `X-Forwarded-Prefix` is appended in every case.
pub fn external_base_url(headers: &HeaderMap) -> String {
    let proto = header_str(headers, X_FORWARDED_PROTO).unwrap_or("http");
    let prefix = header_str(headers, X_FORWARDED_PREFIX).unwrap_or("");

    match (
        header_str(headers, X_FORWARDED_HOST),
        header_str(headers, X_FORWARDED_PORT),
    ) {
        (Some(host), Some(port)) => format!("{proto}://{host}:{port}{prefix}"),
        (Some(host), None) => format!("{proto}://{host}{prefix}"),
        (None, _) => {
            let host = header_str(headers, header::HOST.as_str()).unwrap_or("");
            format!("{proto}://{host}{prefix}")
        }
    }
}

/// Full URL of the request as seen by the caller: the external base URL followed
/// by the original path and query.
pub fn external_url(headers: &HeaderMap, original_uri: &Uri) -> String {
    let path_and_query = original_uri
        .path_and_query()
        .map_or_else(|| original_uri.path(), |pq| pq.as_str());
    format!("{}{}", external_base_url(headers), path_and_query)
}
