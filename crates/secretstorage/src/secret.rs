use crate::{
    error::{Result, SecretServiceError},
    message::{ObjectPath, Value},
    session::{Session, SessionAlgorithm},
};

/// A secret in its wire form, `(oayays)`.
///
/// For encrypted sessions `parameters` holds the 16 byte IV and `value` the AES-128-CBC
/// ciphertext. For plain sessions `parameters` is empty and `value` holds the secret itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    /// The session the secret is encoded for.
    pub session: ObjectPath,
    #[allow(missing_docs)]
    pub parameters: Vec<u8>,
    #[allow(missing_docs)]
    pub value: Vec<u8>,
    /// MIME type of the secret, e.g. `text/plain; charset=utf8`.
    pub content_type: String,
}

impl Secret {
    #[allow(missing_docs)]
    pub const SIGNATURE: &'static str = "(oayays)";

    /// Encode `plaintext` for transfer over `session`.
    ///
    /// Encrypted sessions draw a fresh IV for every call, so encoding the same plaintext twice
    /// produces different ciphertexts.
    pub fn encode(session: &Session, plaintext: impl AsRef<[u8]>, content_type: &str) -> Secret {
        let plaintext = plaintext.as_ref();
        let (parameters, value) = match session.algorithm() {
            SessionAlgorithm::Plain => (Vec::new(), plaintext.to_vec()),
            SessionAlgorithm::Dh { key, .. } => {
                let (iv, ciphertext) = key.encrypt(plaintext);
                (iv.to_vec(), ciphertext)
            }
        };

        Secret {
            session: session.path().clone(),
            parameters,
            value,
            content_type: content_type.to_string(),
        }
    }

    /// Recover the plaintext of a secret received over `session`.
    pub fn decode(&self, session: &Session) -> Result<Vec<u8>> {
        if &self.session != session.path() {
            return Err(SecretServiceError::Protocol(format!(
                "Secret belongs to session {}, not {}",
                self.session,
                session.path()
            )));
        }

        match session.algorithm() {
            SessionAlgorithm::Plain => Ok(self.value.clone()),
            SessionAlgorithm::Dh { key, .. } => Ok(key.decrypt(&self.parameters, &self.value)?),
        }
    }
}

// Secret values are not printed, even for plain sessions.
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("session", &self.session)
            .field("parameters", &self.parameters.len())
            .field("value", &self.value.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl From<Secret> for Value {
    fn from(secret: Secret) -> Self {
        Value::Struct(vec![
            Value::ObjectPath(secret.session),
            Value::Bytes(secret.parameters),
            Value::Bytes(secret.value),
            Value::Str(secret.content_type),
        ])
    }
}

impl TryFrom<Value> for Secret {
    type Error = SecretServiceError;

    fn try_from(value: Value) -> Result<Self> {
        let signature = value.signature();
        match value.into_variant_inner() {
            Value::Struct(fields) => match <[Value; 4]>::try_from(fields) {
                Ok(
                    [Value::ObjectPath(session), Value::Bytes(parameters), Value::Bytes(value), Value::Str(content_type)],
                ) => Ok(Secret {
                    session,
                    parameters,
                    value,
                    content_type,
                }),
                _ => Err(SecretServiceError::Protocol(format!(
                    "Expected a secret {}, got {signature}",
                    Secret::SIGNATURE
                ))),
            },
            _ => Err(SecretServiceError::Protocol(format!(
                "Expected a secret {}, got {signature}",
                Secret::SIGNATURE
            ))),
        }
    }
}
