//! # API Test Utilities
//!
//! Shared test utilities for the API service.
//!
//! This crate provides:
//! - Signing keys (deterministic Ed25519, cached RSA) with matching JWKs
//! - A claims builder (`TestTokenBuilder`)
//! - A wiremock identity provider serving discovery and JWKS documents
//! - Server test harness (`TestApiServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use api_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let key = TestKeypair::rsa(0, "rsa-key-1")?;
//!     let idp = MockIdentityProvider::start(&[&key]).await;
//!     let server = TestApiServer::spawn(&idp).await?;
//!
//!     let token = key.sign(&TestTokenBuilder::for_provider(&idp).build())?;
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod identity_provider;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use identity_provider::*;
pub use server_harness::*;
pub use token_builders::*;
