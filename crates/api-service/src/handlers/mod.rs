//! HTTP request handlers for the API service.

pub mod api;
pub mod health;
pub mod metrics;

pub use api::get_claims;
pub use health::health_check;
pub use metrics::metrics_handler;
