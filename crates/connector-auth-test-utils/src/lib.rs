//! # Connector Auth Test Utilities
//!
//! Shared test utilities for the connector auth service.
//!
//! This crate provides:
//! - Fixed RSA keypairs (reproducible signatures)
//! - Token builders (`TestTokenBuilder`)
//! - A clock that only moves when told to (`ManualClock`)
//! - Server test harness (`TestKeyServer`, `TestConnectorServer`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use connector_auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let keys = TestKeyServer::start().await;
//!     let server = TestConnectorServer::spawn(Some(&keys.key_url())).await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .audience(&format!("{}/v1/me", server.url()))
//!         .sign();
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/v1/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;

pub use connector_auth::clock::ManualClock;
