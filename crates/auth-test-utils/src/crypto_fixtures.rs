//! Fixed RSA keypairs for testing
//!
//! Two 2048-bit keypairs are checked in under `fixtures/`: the keypair the
//! test service signs with, and an unrelated one for forged-signature and
//! mismatch cases. Keys are never generated at test time.

use auth_service::crypto::KeyMaterial;
use auth_service::services::token_service::{TokenConfig, TokenService};
use std::sync::Arc;

/// PKCS#8 private key the test service signs with.
pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/test_private_key.pem");

/// SubjectPublicKeyInfo public key matching [`TEST_PRIVATE_KEY_PEM`].
pub const TEST_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/test_public_key.pem");

/// Unrelated keypair, private half.
pub const OTHER_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/other_private_key.pem");

/// Unrelated keypair, public half.
pub const OTHER_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/other_public_key.pem");

pub const TEST_PRIVATE_KEY_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/test_private_key.pem");

pub const TEST_PUBLIC_KEY_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/test_public_key.pem");

/// Issuer used by every harness-built token service.
pub const TEST_ISSUER: &str = "auth.test";

/// Key material for the test keypair.
pub fn test_key_material() -> Arc<KeyMaterial> {
    Arc::new(
        KeyMaterial::from_pem(TEST_PRIVATE_KEY_PEM, TEST_PUBLIC_KEY_PEM)
            .expect("test keypair fixtures must parse"),
    )
}

/// Token lifetimes used unless a test overrides them.
pub fn test_token_config() -> TokenConfig {
    TokenConfig {
        issuer: TEST_ISSUER.to_string(),
        access_ttl: chrono::Duration::minutes(15),
        refresh_ttl: chrono::Duration::days(7),
        clock_skew: common::jwt::DEFAULT_CLOCK_SKEW,
    }
}

/// Token service over the test keypair.
pub fn test_token_service(config: TokenConfig) -> TokenService {
    TokenService::new(test_key_material(), config)
}
