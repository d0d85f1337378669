//! Observability for the API service.
//!
//! Provides metrics definitions recorded by middleware and the JWKS client.

pub mod metrics;
