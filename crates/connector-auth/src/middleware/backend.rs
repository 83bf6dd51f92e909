//! Backend system headers.
//!
//! The platform forwards the admin-configured backend URL and the backend
//! credential on every connector request. [`read_backend_headers`] records them
//! in [`RequestState`] for handlers that call the backend.

use crate::middleware::forwarded::header_str;
use crate::request_state::{contribute, RequestState};
use axum::{extract::Request, middleware::Next, response::Response};

/// Header carrying the backend base URL.
pub const X_CONNECTOR_BASE_URL: &str = "x-connector-base-url";

/// Header carrying the backend credential.
pub const X_CONNECTOR_AUTHORIZATION: &str = "x-connector-authorization";

/// Middleware that records the backend headers in [`RequestState`].
///
/// Missing headers leave the corresponding fields unset.
pub async fn read_backend_headers(mut req: Request, next: Next) -> Response {
    let headers = req.headers();
    let backend = RequestState {
        backend_base_url: header_str(headers, X_CONNECTOR_BASE_URL).map(ToString::to_string),
        backend_authorization: header_str(headers, X_CONNECTOR_AUTHORIZATION)
            .map(ToString::to_string),
        ..RequestState::default()
    };

    contribute(req.extensions_mut(), backend);
    next.run(req).await
}
