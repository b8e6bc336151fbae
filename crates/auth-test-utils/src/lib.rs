//! # Auth Test Utilities
//!
//! Shared test utilities for the auth service.
//!
//! This crate provides:
//! - Fixed RSA keypairs checked in as PEM fixtures
//! - Service harness (TestAuthService over the in-memory stores)
//! - Server harness (TestAuthServer for HTTP tests)
//! - Fixed test IDs and credentials
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let harness = TestAuthService::new();
//!     let registered = harness.service.register(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
//!
//!     registered
//!         .tokens
//!         .access_token
//!         .assert_valid_jwt()
//!         .assert_for_subject(&registered.user_id.to_string())
//!         .assert_has_role("USER");
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod service_harness;
pub mod test_ids;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use service_harness::*;
pub use test_ids::*;
