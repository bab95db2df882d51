#![no_main]

use libfuzzer_sys::fuzz_target;
use secretstorage_crypto::DhKeyPair;

// Deriving a session key from an arbitrary peer public key should never panic
fuzz_target!(|data: &[u8]| {
    let _ = DhKeyPair::generate(rand::thread_rng()).derive_session_key(data);
});
