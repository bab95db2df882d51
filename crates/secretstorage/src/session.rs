use secretstorage_crypto::{Aes128CbcKey, DhKeyPair};

use crate::{
    constants::{errors::DBUS_NOT_SUPPORTED, ALGORITHM_DH, ALGORITHM_PLAIN},
    error::{Result, SecretServiceError},
    message::{ObjectPath, Value},
    proxy::ServiceProxy,
    traits::{Connection, TransportError},
};

/// The transport algorithm negotiated for a [`Session`].
pub enum SessionAlgorithm {
    /// Secrets travel in plain text.
    Plain,
    /// Secrets are encrypted with a key agreed through Diffie-Hellman.
    Dh {
        /// The derived AES-128 key.
        key: Aes128CbcKey,
        /// The public key sent to the service, big-endian.
        client_public_key: Vec<u8>,
        /// The public key received from the service, big-endian.
        server_public_key: Vec<u8>,
    },
}

/// A negotiated transport session.
///
/// A session is bound to the connection it was opened on and lives as long as that connection.
/// The service has no separate teardown for it.
pub struct Session {
    path: ObjectPath,
    algorithm: SessionAlgorithm,
}

impl Session {
    /// The object path the service assigned to this session.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    #[allow(missing_docs)]
    pub fn algorithm(&self) -> &SessionAlgorithm {
        &self.algorithm
    }

    #[allow(missing_docs)]
    pub fn is_encrypted(&self) -> bool {
        matches!(self.algorithm, SessionAlgorithm::Dh { .. })
    }

    /// The session key, present if and only if the session is encrypted.
    pub fn symmetric_key(&self) -> Option<&Aes128CbcKey> {
        match &self.algorithm {
            SessionAlgorithm::Plain => None,
            SessionAlgorithm::Dh { key, .. } => Some(key),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

/// Open a new transport session with the service.
///
/// Offers the DH algorithm first. If the service answers that it is not supported, a plain
/// session is opened instead; there are no other retries.
pub async fn open_session<C: Connection>(connection: &C) -> Result<Session> {
    let service = ServiceProxy::service(connection);
    let key_pair = DhKeyPair::generate(rand::thread_rng());
    let client_public_key = key_pair.public_key_bytes();

    let reply = service
        .call(
            "OpenSession",
            "sv",
            vec![
                Value::from(ALGORITHM_DH),
                Value::variant(Value::Bytes(client_public_key.clone())),
            ],
        )
        .await;

    match reply {
        Ok(reply) => {
            let (output, path) = parse_open_session_reply(reply)?;
            let server_public_key = match output.into_variant_inner() {
                Value::Bytes(bytes) => bytes,
                other => {
                    return Err(SecretServiceError::Protocol(format!(
                        "OpenSession returned {} instead of a public key",
                        other.signature()
                    )))
                }
            };
            let key = key_pair
                .derive_session_key(&server_public_key)
                .map_err(|e| SecretServiceError::Protocol(e.to_string()))?;

            log::debug!("Opened encrypted session {path}");
            Ok(Session {
                path,
                algorithm: SessionAlgorithm::Dh {
                    key,
                    client_public_key,
                    server_public_key,
                },
            })
        }
        Err(SecretServiceError::Transport(TransportError::ErrorReply { name, .. }))
            if name == DBUS_NOT_SUPPORTED =>
        {
            log::debug!("Service does not support {ALGORITHM_DH}, falling back to plain session");
            let reply = service
                .call(
                    "OpenSession",
                    "sv",
                    vec![Value::from(ALGORITHM_PLAIN), Value::variant("")],
                )
                .await
                .map_err(SecretServiceError::unavailable_if_disconnected)?;
            let (_, path) = parse_open_session_reply(reply)?;

            log::debug!("Opened plain session {path}");
            Ok(Session {
                path,
                algorithm: SessionAlgorithm::Plain,
            })
        }
        Err(e) => Err(e.unavailable_if_disconnected()),
    }
}

fn parse_open_session_reply(reply: Vec<Value>) -> Result<(Value, ObjectPath)> {
    let mut reply = reply.into_iter();
    match (reply.next(), reply.next()) {
        (Some(output), Some(Value::ObjectPath(path))) => Ok((output, path)),
        _ => Err(SecretServiceError::Protocol(
            "OpenSession did not return (output, session path)".to_string(),
        )),
    }
}
