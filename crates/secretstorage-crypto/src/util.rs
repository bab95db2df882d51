use std::pin::Pin;

use generic_array::{ArrayLength, GenericArray};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use zeroize::{Zeroize, Zeroizing};

use crate::{CryptoError, Result};

/// [RFC5869](https://datatracker.ietf.org/doc/html/rfc5869) HKDF-SHA256 with no salt and empty
/// info, which is what the Secret Service uses to turn the DH shared secret into an AES key.
pub(crate) fn hkdf_sha256<T: ArrayLength<u8>>(ikm: &[u8]) -> Result<Pin<Box<GenericArray<u8, T>>>> {
    let hkdf = hkdf::Hkdf::<sha2::Sha256>::new(None, ikm);
    let mut key = Box::<GenericArray<u8, T>>::default();

    hkdf.expand(&[], &mut key)
        .map_err(|_| CryptoError::KeyDerivation)?;

    Ok(Box::into_pin(key))
}

/// Generate random bytes that are cryptographically secure
///
/// Uses the thread local CSPRNG, so concurrent callers never share generator state.
pub fn generate_random_bytes<T>() -> Zeroizing<T>
where
    Standard: Distribution<T>,
    T: Zeroize,
{
    Zeroizing::new(rand::thread_rng().gen::<T>())
}
