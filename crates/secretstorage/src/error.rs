use std::time::Duration;

use secretstorage_crypto::CryptoError;
use thiserror::Error;

use crate::traits::TransportError;

/// Errors returned by the Secret Service protocol engine.
///
/// Transport faults are translated once by [`ServiceProxy`](crate::ServiceProxy) and propagated
/// unchanged afterwards. Anything the translation table does not cover is passed through as
/// [`SecretServiceError::Transport`], so callers must not assume the other kinds are exhaustive.
#[derive(Debug, Error)]
pub enum SecretServiceError {
    /// The service cannot be reached or failed to answer.
    #[error("Secret Service is not available: {0}")]
    ServiceUnavailable(String),

    /// The referenced object does not exist, or does not implement the called method.
    #[error("Item does not exist!")]
    ItemNotFound,

    /// The operation requires an unlocked collection or item.
    #[error("Cannot perform operation: {0} is locked")]
    Locked(String),

    /// The user declined the prompt.
    #[error("Prompt dismissed.")]
    PromptDismissed,

    /// The prompt did not complete within the configured timeout.
    #[error("Prompt was not completed within {0:?}")]
    PromptTimeout(Duration),

    /// A received secret could not be decrypted.
    #[error("Failed to decode secret: {0}")]
    Decoding(#[from] CryptoError),

    /// A reply or request does not have the shape the protocol requires.
    #[error("Unexpected reply from the service: {0}")]
    Protocol(String),

    /// A transport failure not covered by the translation table.
    #[error(transparent)]
    Transport(TransportError),
}

impl SecretServiceError {
    /// A connection that is gone means the service cannot be reached.
    pub(crate) fn unavailable_if_disconnected(self) -> Self {
        match self {
            SecretServiceError::Transport(
                e @ (TransportError::Disconnected | TransportError::Io(_)),
            ) => SecretServiceError::ServiceUnavailable(e.to_string()),
            e => e,
        }
    }
}

/// Alias for `Result<T, SecretServiceError>`.
pub type Result<T, E = SecretServiceError> = std::result::Result<T, E>;
