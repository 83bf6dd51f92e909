//! Connector Auth Library
//!
//! Per-request trust layer for connector services: verifies the identity token
//! an upstream platform attaches to each inbound request and exposes the
//! verified caller identity to downstream handlers.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/{key_cache, verifier, identity}.rs
//! ```
//!
//! A request reaching a protected route goes through `require_identity`, which
//! resolves the audience from the request's external URL, fetches the signing
//! key through the TTL cache, verifies the token and attaches an
//! `IdentityContext`. Every failure becomes a `401` with a JSON message.
//!
//! # Modules
//!
//! - `auth` - Key retrieval, key cache, token verification, identity building
//! - `clock` - Injectable time source
//! - `config` - Service configuration from environment
//! - `errors` - Error types and the 401 rejection response
//! - `handlers` - HTTP request handlers
//! - `middleware` - Request id, backend and routing headers, forwarded URL and
//!   authentication middleware
//! - `observability` - Metrics
//! - `request_state` - Request-scoped correlation and identity state
//! - `routes` - Axum router setup

pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod request_state;
pub mod routes;
