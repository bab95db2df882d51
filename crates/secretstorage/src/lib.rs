#![doc = include_str!("../README.md")]

pub mod constants;
mod error;
pub use error::{Result, SecretServiceError};
mod match_rule;
pub use match_rule::{add_match_rules, MatchRule};
mod message;
pub use message::{BusAddress, MethodCall, ObjectPath, Signal, Value};
mod prompt;
pub use prompt::{exec_prompt, unlock_objects, PromptCoordinator, PromptOutcome};
mod proxy;
pub use proxy::ServiceProxy;
mod router;
pub use router::{ReceiveError, SignalMatch, SignalRouter, SignalSubscription};
mod secret;
pub use secret::Secret;
mod service;
pub use service::SecretService;
mod session;
pub use session::{open_session, Session, SessionAlgorithm};
mod settings;
pub use settings::SecretServiceSettings;
pub mod traits;

pub use secretstorage_crypto::{Aes128CbcKey, CryptoError};
