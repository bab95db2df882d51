//! Interfaces the platform implements to carry messages for the protocol engine.

mod connection;

pub use connection::{Connection, TransportError};
