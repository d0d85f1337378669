//! Resource server sample.
//!
//! An HTTP API that accepts bearer tokens issued by an OpenID Connect
//! identity provider and returns a projection of the validated claims.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/jwt.rs -> auth/jwks.rs
//!               -> handlers/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Discovery, JWKS cache and token validation
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Auth gate and request metrics
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
