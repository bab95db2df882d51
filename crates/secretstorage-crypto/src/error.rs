use thiserror::Error;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("The peer public key is outside of the valid range for the group")]
    InvalidPublicKey,

    #[error("Invalid initialization vector, expected 16 bytes but got {0}")]
    InvalidIv(usize),

    #[error("Invalid ciphertext length {0}, expected a non-zero multiple of the block size")]
    InvalidCiphertextLength(usize),

    #[error("Invalid PKCS#7 padding")]
    InvalidPadding,

    #[error("Key derivation failed")]
    KeyDerivation,
}

/// Alias for `Result<T, CryptoError>`.
pub(crate) type Result<T, E = CryptoError> = std::result::Result<T, E>;
