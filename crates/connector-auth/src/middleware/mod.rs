//! HTTP middleware.
//!
//! # Components
//!
//! - `request_id` - Request id propagation into [`RequestState`](crate::request_state::RequestState)
//! - `backend` - Backend base URL and credential headers
//! - `routing` - Mobile Flows routing prefix and template with the context path
//! - `forwarded` - Externally visible URL from `X-Forwarded-*` headers
//! - `auth` - Token authentication for protected routes

pub mod auth;
pub mod backend;
pub mod forwarded;
pub mod request_id;
pub mod routing;

pub use auth::{require_identity, RequestAuthenticator};
pub use backend::read_backend_headers;
pub use forwarded::{external_base_url, external_url};
pub use request_id::propagate_request_id;
pub use routing::add_context_path;
