#![no_main]

use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use secretstorage_crypto::{Aes128CbcKey, DhKeyPair};

static KEY: LazyLock<Option<Aes128CbcKey>> = LazyLock::new(|| {
    let client = DhKeyPair::generate(rand::thread_rng());
    let service = DhKeyPair::generate(rand::thread_rng());
    client.derive_session_key(&service.public_key_bytes()).ok()
});

// Decrypting an arbitrary IV and ciphertext should never panic
fuzz_target!(|data: &[u8]| {
    let Some(key) = KEY.as_ref() else {
        return;
    };
    let (iv, ciphertext) = data.split_at(data.len().min(16));
    let _ = key.decrypt(iv, ciphertext);
});
