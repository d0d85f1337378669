//! Client application sample.
//!
//! Serves the browser bundle, fills in its `authConfig.js` from the
//! environment and proxies `/api` to the resource server with the caller's
//! bearer token.
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `routes` - Axum router setup

pub mod config;
pub mod errors;
pub mod handlers;
pub mod routes;
