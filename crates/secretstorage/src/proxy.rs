use crate::{
    constants::{
        errors::{
            DBUS_EXEC_FAILED, DBUS_NO_REPLY, DBUS_NO_SUCH_OBJECT, DBUS_SERVICE_UNKNOWN,
            DBUS_UNKNOWN_METHOD,
        },
        BUS_NAME, PROMPT_IFACE, PROPERTIES_IFACE, SERVICE_IFACE, SS_PATH,
    },
    error::{Result, SecretServiceError},
    message::{BusAddress, MethodCall, ObjectPath, Value},
    traits::{Connection, TransportError},
};

/// A remote object reference that issues calls over a [`Connection`] and translates error
/// replies into [`SecretServiceError`] kinds.
///
/// Every call of the protocol engine goes through this type, so the translation is applied
/// uniformly.
pub struct ServiceProxy<'a, C>
where
    C: Connection,
{
    connection: &'a C,
    address: BusAddress,
}

impl<'a, C> ServiceProxy<'a, C>
where
    C: Connection,
{
    #[allow(missing_docs)]
    pub fn new(connection: &'a C, address: BusAddress) -> Self {
        Self {
            connection,
            address,
        }
    }

    /// The top-level service object.
    pub fn service(connection: &'a C) -> Self {
        Self::new(connection, BusAddress::new(BUS_NAME, SS_PATH, SERVICE_IFACE))
    }

    /// A prompt object returned by the service.
    pub fn prompt(connection: &'a C, path: ObjectPath) -> Self {
        Self::new(connection, BusAddress::new(BUS_NAME, path, PROMPT_IFACE))
    }

    #[allow(missing_docs)]
    pub fn address(&self) -> &BusAddress {
        &self.address
    }

    async fn send(&self, message: MethodCall) -> Result<Vec<Value>> {
        log::trace!(
            "Calling {}.{} on {}",
            message.interface,
            message.member,
            message.path
        );
        self.connection
            .call(message)
            .await
            .map_err(translate_error)
    }

    /// Call `method` on this object's interface.
    pub async fn call(&self, method: &str, signature: &str, body: Vec<Value>) -> Result<Vec<Value>> {
        self.send(MethodCall::new(&self.address, method, signature, body))
            .await
    }

    /// Read a property of this object's interface.
    pub async fn get_property(&self, name: &str) -> Result<Value> {
        let reply = self
            .send(MethodCall::new(
                &self.properties_address(),
                "Get",
                "ss",
                vec![
                    Value::from(self.address.interface.as_str()),
                    Value::from(name),
                ],
            ))
            .await?;

        reply
            .into_iter()
            .next()
            .map(Value::into_variant_inner)
            .ok_or_else(|| {
                SecretServiceError::Protocol(format!("Empty reply when reading property {name}"))
            })
    }

    /// Write a property of this object's interface. `signature` must be the signature of `value`.
    pub async fn set_property(&self, name: &str, signature: &str, value: Value) -> Result<()> {
        if value.signature() != signature {
            return Err(SecretServiceError::Protocol(format!(
                "Value for property {name} has signature {}, expected {signature}",
                value.signature()
            )));
        }

        self.send(MethodCall::new(
            &self.properties_address(),
            "Set",
            "ssv",
            vec![
                Value::from(self.address.interface.as_str()),
                Value::from(name),
                Value::variant(value),
            ],
        ))
        .await?;
        Ok(())
    }

    fn properties_address(&self) -> BusAddress {
        BusAddress {
            interface: PROPERTIES_IFACE.to_string(),
            ..self.address.clone()
        }
    }
}

/// Map transport error replies to the error kinds callers act on. Unknown errors pass through.
pub(crate) fn translate_error(error: TransportError) -> SecretServiceError {
    match error {
        TransportError::ErrorReply { name, .. }
            if matches!(name.as_str(), DBUS_UNKNOWN_METHOD | DBUS_NO_SUCH_OBJECT) =>
        {
            SecretServiceError::ItemNotFound
        }
        TransportError::ErrorReply { name, body }
            if matches!(
                name.as_str(),
                DBUS_SERVICE_UNKNOWN | DBUS_EXEC_FAILED | DBUS_NO_REPLY
            ) =>
        {
            SecretServiceError::ServiceUnavailable(error_message(&name, &body))
        }
        other => SecretServiceError::Transport(other),
    }
}

// The first body element carries the human readable message.
fn error_message(name: &str, body: &[Value]) -> String {
    match body.first() {
        Some(Value::Str(message)) => message.clone(),
        Some(other) => format!("{other:?}"),
        None => name.to_string(),
    }
}
