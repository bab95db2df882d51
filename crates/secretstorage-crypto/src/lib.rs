#![doc = include_str!("../README.md")]

//! # Pinned heap data
//!
//! This crate uses a `Pin<Box<>>` strategy to ensure key data is stored on the heap and not moved
//! around. `GenericArray` is equivalent to `[u8; N]`, which is a Copy type placed on the stack. To
//! keep the compiler from making stack copies when moving keys around, we use a Box to keep the
//! values on the heap, and pin the box so that the contents can't be pulled out and moved.

mod aes;
mod dh;
pub use dh::{DhKeyPair, DH_GENERATOR, DH_PRIME};
mod error;
pub(crate) use error::Result;
pub use error::CryptoError;
mod keys;
pub use keys::Aes128CbcKey;
mod util;
pub use util::generate_random_bytes;
