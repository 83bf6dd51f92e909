//! Common utilities shared across connector components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (header inspection, validity window checks, constants)
pub mod jwt;
