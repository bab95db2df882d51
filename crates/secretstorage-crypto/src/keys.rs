use std::pin::Pin;

use generic_array::GenericArray;
use subtle::{Choice, ConstantTimeEq};
use typenum::U16;
use zeroize::ZeroizeOnDrop;

use crate::{
    aes::{decrypt_aes128_cbc, encrypt_aes128_cbc, BLOCK_SIZE},
    util::{generate_random_bytes, hkdf_sha256},
    Result,
};

/// Aes128CbcKey is the symmetric key of an encrypted transport session, consisting of one 128-bit
/// key. The ciphertext is not authenticated; the key only protects secrets while they travel over
/// the bus.
#[derive(ZeroizeOnDrop, Clone)]
pub struct Aes128CbcKey {
    /// Uses a pinned heap data structure, as noted in [Pinned heap data][crate#pinned-heap-data]
    pub(crate) enc_key: Pin<Box<GenericArray<u8, U16>>>,
}

impl Aes128CbcKey {
    /// Derive the session key from the serialized DH shared secret.
    pub(crate) fn derive(shared_secret: &[u8]) -> Result<Self> {
        Ok(Aes128CbcKey {
            enc_key: hkdf_sha256::<U16>(shared_secret)?,
        })
    }

    /// Encrypt `plaintext` under a freshly generated random IV.
    ///
    /// Returns the IV together with the padded ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> ([u8; BLOCK_SIZE], Vec<u8>) {
        let iv = generate_random_bytes::<[u8; BLOCK_SIZE]>();
        let ciphertext = encrypt_aes128_cbc(&self.enc_key, &iv, plaintext);
        (*iv, ciphertext)
    }

    /// Decrypt a ciphertext produced by [Aes128CbcKey::encrypt] or by the service.
    pub fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        decrypt_aes128_cbc(&self.enc_key, iv, ciphertext)
    }
}

impl ConstantTimeEq for Aes128CbcKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.enc_key.ct_eq(&other.enc_key)
    }
}

impl PartialEq for Aes128CbcKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

// Don't leak the key material through debug output.
impl std::fmt::Debug for Aes128CbcKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes128CbcKey").finish_non_exhaustive()
    }
}
