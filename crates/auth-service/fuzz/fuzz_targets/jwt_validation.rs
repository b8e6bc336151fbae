#![no_main]

use auth_service::crypto::KeyMaterial;
use auth_service::services::token_service::{TokenConfig, TokenService};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};

const PRIVATE_KEY_PEM: &str = include_str!("../../../auth-test-utils/fixtures/test_private_key.pem");
const PUBLIC_KEY_PEM: &str = include_str!("../../../auth-test-utils/fixtures/test_public_key.pem");

fn service() -> &'static TokenService {
    static SERVICE: OnceLock<TokenService> = OnceLock::new();
    SERVICE.get_or_init(|| {
        let keys = KeyMaterial::from_pem(PRIVATE_KEY_PEM, PUBLIC_KEY_PEM).expect("fixture keys");
        TokenService::new(
            Arc::new(keys),
            TokenConfig {
                issuer: "auth.fuzz".to_string(),
                access_ttl: chrono::Duration::minutes(15),
                refresh_ttl: chrono::Duration::days(7),
                clock_skew: common::jwt::DEFAULT_CLOCK_SKEW,
            },
        )
    })
}

fuzz_target!(|data: &[u8]| {
    if let Ok(token) = std::str::from_utf8(data) {
        // Verification must reject, never panic, on arbitrary input
        let _ = service().verify(token);
        let _ = service().extract_subject(token);
        let _ = common::jwt::extract_kid(token);
    }
});
