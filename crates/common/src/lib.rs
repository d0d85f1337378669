//! Common utilities shared by the sample API and app services.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (header inspection, iat checks, scopes, constants)
pub mod jwt;

/// Module for graceful shutdown signal handling
pub mod shutdown;
