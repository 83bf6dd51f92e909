//! Token authentication.
//!
//! Leaves first: [`key_source`] fetches the issuer's public key, [`key_cache`]
//! keeps it for a TTL, [`verifier`] checks tokens against it, and [`identity`]
//! turns verified [`claims`] into the per-request identity.

pub mod claims;
pub mod identity;
pub mod key_cache;
pub mod key_source;
pub mod verifier;

pub use claims::IdentityClaims;
pub use identity::IdentityContext;
pub use key_cache::{KeyCache, SigningKey};
pub use key_source::{HttpKeySource, SigningKeySource};
pub use verifier::TokenVerifier;
