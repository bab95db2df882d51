//! Diffie-Hellman key agreement for the `dh-ietf1024-sha256-aes128-cbc-pkcs7` session algorithm.

use num_bigint::BigUint;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::{Aes128CbcKey, CryptoError, Result};

const GROUP_LEN: usize = 128;

/// The 1024-bit MODP prime of the RFC 2409 Second Oakley Group, big-endian.
pub const DH_PRIME: [u8; GROUP_LEN] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc9, 0x0f, 0xda, 0xa2, 0x21, 0x68, 0xc2, 0x34,
    0xc4, 0xc6, 0x62, 0x8b, 0x80, 0xdc, 0x1c, 0xd1, 0x29, 0x02, 0x4e, 0x08, 0x8a, 0x67, 0xcc, 0x74,
    0x02, 0x0b, 0xbe, 0xa6, 0x3b, 0x13, 0x9b, 0x22, 0x51, 0x4a, 0x08, 0x79, 0x8e, 0x34, 0x04, 0xdd,
    0xef, 0x95, 0x19, 0xb3, 0xcd, 0x3a, 0x43, 0x1b, 0x30, 0x2b, 0x0a, 0x6d, 0xf2, 0x5f, 0x14, 0x37,
    0x4f, 0xe1, 0x35, 0x6d, 0x6d, 0x51, 0xc2, 0x45, 0xe4, 0x85, 0xb5, 0x76, 0x62, 0x5e, 0x7e, 0xc6,
    0xf4, 0x4c, 0x42, 0xe9, 0xa6, 0x37, 0xed, 0x6b, 0x0b, 0xff, 0x5c, 0xb6, 0xf4, 0x06, 0xb7, 0xed,
    0xee, 0x38, 0x6b, 0xfb, 0x5a, 0x89, 0x9f, 0xa5, 0xae, 0x9f, 0x24, 0x11, 0x7c, 0x4b, 0x1f, 0xe6,
    0x49, 0x28, 0x66, 0x51, 0xec, 0xe6, 0x53, 0x81, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Generator of the Second Oakley Group.
pub const DH_GENERATOR: u32 = 2;

fn prime() -> BigUint {
    BigUint::from_bytes_be(&DH_PRIME)
}

/// An ephemeral key pair for a single session negotiation.
///
/// The private exponent never leaves this struct; the public key is sent to the peer as unsigned
/// big-endian bytes.
pub struct DhKeyPair {
    private_key: Zeroizing<[u8; GROUP_LEN]>,
    public_key: BigUint,
}

impl DhKeyPair {
    /// Generate a new key pair with a 1024-bit random private exponent.
    pub fn generate(mut rng: impl RngCore + CryptoRng) -> Self {
        let mut private_key = Zeroizing::new([0u8; GROUP_LEN]);
        rng.fill_bytes(private_key.as_mut_slice());
        Self::from_private_key(private_key)
    }

    fn from_private_key(private_key: Zeroizing<[u8; GROUP_LEN]>) -> Self {
        let exponent = BigUint::from_bytes_be(private_key.as_slice());
        let public_key = BigUint::from(DH_GENERATOR).modpow(&exponent, &prime());
        DhKeyPair {
            private_key,
            public_key,
        }
    }

    /// The public key `g^x mod p`.
    pub fn public_key(&self) -> &BigUint {
        &self.public_key
    }

    /// The public key as unsigned big-endian bytes without leading zeros.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.to_bytes_be()
    }

    /// Compute the shared secret with the peer public key and derive the AES-128 session key.
    ///
    /// The shared secret is left-padded to the group size before HKDF-SHA256, matching the
    /// service. Peer keys of `0`, `1`, `p - 1` or anything not below `p` are rejected.
    pub fn derive_session_key(&self, peer_public_key: &[u8]) -> Result<Aes128CbcKey> {
        let p = prime();
        let peer = BigUint::from_bytes_be(peer_public_key);
        if peer <= BigUint::one() || peer >= &p - 1u32 {
            return Err(CryptoError::InvalidPublicKey);
        }

        let exponent = BigUint::from_bytes_be(self.private_key.as_slice());
        let shared_secret = Zeroizing::new(peer.modpow(&exponent, &p).to_bytes_be());

        let mut padded = Zeroizing::new([0u8; GROUP_LEN]);
        padded[GROUP_LEN - shared_secret.len()..].copy_from_slice(&shared_secret);

        Aes128CbcKey::derive(padded.as_slice())
    }
}

impl std::fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
