//! Fixed test IDs and credentials for deterministic tests
//!
//! Using fixed values prevents flaky tests caused by random data.

use uuid::Uuid;

// User IDs (100-199), for tests that need a user id without registering one
pub const TEST_USER_ALICE: Uuid = Uuid::from_u128(100);
pub const TEST_USER_BOB: Uuid = Uuid::from_u128(101);

// Emails
pub const TEST_EMAIL_ALICE: &str = "alice@example.com";
pub const TEST_EMAIL_BOB: &str = "bob@example.com";

// Passwords
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const TEST_WRONG_PASSWORD: &str = "Tr0ub4dor&3";

// Source addresses
pub const TEST_IP: &str = "203.0.113.7";
