//! HTTP request handlers for the client application.

pub mod auth_config;
pub mod health;
pub mod proxy;

pub use auth_config::auth_config;
pub use health::health_check;
pub use proxy::proxy_api;
