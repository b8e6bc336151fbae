#![no_main]

use auth_service::crypto::KeyMaterial;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(pem) = std::str::from_utf8(data) {
        let _ = common::jwt::decode_pem_body(pem);
        let _ = KeyMaterial::from_pem(pem, pem);
    }
});
