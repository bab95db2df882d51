use std::fmt;

use serde::{Deserialize, Serialize};

/// A bus object path, such as `/org/freedesktop/secrets/collection/login`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPath(String);

impl ObjectPath {
    #[allow(missing_docs)]
    pub fn new(path: impl Into<String>) -> Self {
        ObjectPath(path.into())
    }

    /// The root path `/`, which the service returns when no prompt is necessary.
    pub fn root() -> Self {
        ObjectPath("/".to_string())
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this path is the "no prompt" sentinel, i.e. `/` or empty.
    pub fn is_root_or_empty(&self) -> bool {
        self.0.len() <= 1
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(value: &str) -> Self {
        ObjectPath::new(value)
    }
}

/// A value of the bus type system, restricted to the types used by the Secret Service API.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U32(u32),
    U64(u64),
    Str(String),
    ObjectPath(ObjectPath),
    /// A byte array, `ay`.
    Bytes(Vec<u8>),
    /// A homogeneous array. `element` is the element signature, which is needed for empty arrays.
    Array {
        element: String,
        items: Vec<Value>,
    },
    Struct(Vec<Value>),
    Variant(Box<Value>),
}

impl Value {
    /// Wrap a value in a variant.
    pub fn variant(value: impl Into<Value>) -> Self {
        Value::Variant(Box::new(value.into()))
    }

    /// An `ao` array.
    pub fn object_path_array(paths: &[ObjectPath]) -> Self {
        Value::Array {
            element: "o".to_string(),
            items: paths.iter().cloned().map(Value::ObjectPath).collect(),
        }
    }

    /// The type signature of this value.
    pub fn signature(&self) -> String {
        match self {
            Value::Bool(_) => "b".to_string(),
            Value::U32(_) => "u".to_string(),
            Value::U64(_) => "t".to_string(),
            Value::Str(_) => "s".to_string(),
            Value::ObjectPath(_) => "o".to_string(),
            Value::Bytes(_) => "ay".to_string(),
            Value::Array { element, .. } => format!("a{element}"),
            Value::Struct(fields) => {
                let inner: String = fields.iter().map(Value::signature).collect();
                format!("({inner})")
            }
            Value::Variant(_) => "v".to_string(),
        }
    }

    #[allow(missing_docs)]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_object_path(&self) -> Option<&ObjectPath> {
        match self {
            Value::ObjectPath(path) => Some(path),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Unwrap a variant, or return the value itself if it is not a variant.
    pub fn into_variant_inner(self) -> Value {
        match self {
            Value::Variant(inner) => *inner,
            other => other,
        }
    }

    /// Interpret the value as a list of object paths.
    ///
    /// Accepts an `ao` array or a single `o`; returns `None` for anything else.
    pub fn object_paths(&self) -> Option<Vec<ObjectPath>> {
        match self {
            Value::ObjectPath(path) => Some(vec![path.clone()]),
            Value::Array { items, .. } => items
                .iter()
                .map(|item| item.as_object_path().cloned())
                .collect(),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectPath> for Value {
    fn from(value: ObjectPath) -> Self {
        Value::ObjectPath(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

/// Destination of a method call: a bus name, an object path and an interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusAddress {
    #[allow(missing_docs)]
    pub bus_name: String,
    #[allow(missing_docs)]
    pub path: ObjectPath,
    #[allow(missing_docs)]
    pub interface: String,
}

impl BusAddress {
    #[allow(missing_docs)]
    pub fn new(
        bus_name: impl Into<String>,
        path: impl Into<ObjectPath>,
        interface: impl Into<String>,
    ) -> Self {
        BusAddress {
            bus_name: bus_name.into(),
            path: path.into(),
            interface: interface.into(),
        }
    }
}

/// An outgoing method call.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodCall {
    pub destination: String,
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    pub signature: String,
    pub body: Vec<Value>,
}

impl MethodCall {
    #[allow(missing_docs)]
    pub fn new(
        address: &BusAddress,
        member: impl Into<String>,
        signature: impl Into<String>,
        body: Vec<Value>,
    ) -> Self {
        MethodCall {
            destination: address.bus_name.clone(),
            path: address.path.clone(),
            interface: address.interface.clone(),
            member: member.into(),
            signature: signature.into(),
            body,
        }
    }
}

/// An incoming signal.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signal {
    pub sender: String,
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    pub body: Vec<Value>,
}
