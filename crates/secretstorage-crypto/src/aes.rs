//! # AES-128-CBC operations
//!
//! Contains low level AES operations used by the transport session. The Secret Service protocol
//! transfers secrets as AES-128-CBC with PKCS#7 padding and does not authenticate them, so these
//! functions must only be used for the wire format.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use generic_array::GenericArray;
use typenum::U16;

use crate::{CryptoError, Result};

pub(crate) const BLOCK_SIZE: usize = 16;

/// Encrypt using AES-128 in CBC mode.
///
/// Padding is always added, so block aligned input grows by one full block.
pub(crate) fn encrypt_aes128_cbc(
    key: &GenericArray<u8, U16>,
    iv: &[u8; BLOCK_SIZE],
    data: &[u8],
) -> Vec<u8> {
    cbc::Encryptor::<aes::Aes128>::new(key, GenericArray::from_slice(iv))
        .encrypt_padded_vec_mut::<Pkcs7>(data)
}

/// Decrypt using AES-128 in CBC mode and strip the PKCS#7 padding.
pub(crate) fn decrypt_aes128_cbc(
    key: &GenericArray<u8, U16>,
    iv: &[u8],
    data: &[u8],
) -> Result<Vec<u8>> {
    if iv.len() != BLOCK_SIZE {
        return Err(CryptoError::InvalidIv(iv.len()));
    }
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength(data.len()));
    }

    cbc::Decryptor::<aes::Aes128>::new(key, GenericArray::from_slice(iv))
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| CryptoError::InvalidPadding)
}
