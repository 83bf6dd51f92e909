//! Request id propagation.
//!
//! Reads `X-Request-Id` or generates `gen-<uuid>` and seeds the request's
//! [`RequestState`] with it, so later log lines and rejections can be correlated.

use crate::request_state::{contribute, RequestState};
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

/// Header carrying the correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Prefix of generated request ids.
const GENERATED_ID_PREFIX: &str = "gen-";

/// Middleware that records the request id in [`RequestState`].
pub async fn propagate_request_id(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map_or_else(generate_request_id, ToString::to_string);

    contribute(req.extensions_mut(), RequestState::with_request_id(request_id));

    next.run(req).await
}

fn generate_request_id() -> String {
    format!("{GENERATED_ID_PREFIX}{}", Uuid::new_v4())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn echo_request_id(Extension(state): Extension<RequestState>) -> String {
        state.request_id.unwrap_or_default()
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(echo_request_id))
            .layer(middleware::from_fn(propagate_request_id))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_uses_incoming_header() {
        let request = Request::builder()
            .uri("/")
            .header(X_REQUEST_ID, "req-id-1")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(body_string(response).await, "req-id-1");
    }

    #[tokio::test]
    async fn test_generates_id_when_missing() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();
        let id = body_string(response).await;

        let uuid_part = id.strip_prefix("gen-").unwrap();
        assert!(Uuid::parse_str(uuid_part).is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
