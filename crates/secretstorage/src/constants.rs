//! Bus names, object paths, interfaces and error names of the Secret Service API.

/// Well-known bus name of the Secret Service.
pub const BUS_NAME: &str = "org.freedesktop.secrets";
/// Object path of the top-level service object.
pub const SS_PATH: &str = "/org/freedesktop/secrets";
/// Prefix shared by all Secret Service interface names.
pub const SS_PREFIX: &str = "org.freedesktop.Secret.";

/// Interface of the service object.
pub const SERVICE_IFACE: &str = "org.freedesktop.Secret.Service";
/// Interface of collection objects.
pub const COLLECTION_IFACE: &str = "org.freedesktop.Secret.Collection";
/// Interface of item objects.
pub const ITEM_IFACE: &str = "org.freedesktop.Secret.Item";
/// Interface of prompt objects.
pub const PROMPT_IFACE: &str = "org.freedesktop.Secret.Prompt";
/// Interface implemented by every object for property access.
pub const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

/// The message bus itself, used to install match rules.
pub const DBUS_NAME: &str = "org.freedesktop.DBus";
/// Object path of the message bus.
pub const DBUS_PATH: &str = "/org/freedesktop/DBus";
/// Interface of the message bus.
pub const DBUS_IFACE: &str = "org.freedesktop.DBus";

/// Session algorithm with no transport encryption.
pub const ALGORITHM_PLAIN: &str = "plain";
/// Session algorithm using DH key agreement and AES-128-CBC.
pub const ALGORITHM_DH: &str = "dh-ietf1024-sha256-aes128-cbc-pkcs7";

/// Name of the signal emitted by a prompt when it finishes.
pub const PROMPT_COMPLETED: &str = "Completed";

#[allow(missing_docs)]
pub mod errors {
    pub const DBUS_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
    pub const DBUS_NO_SUCH_OBJECT: &str = "org.freedesktop.Secret.Error.NoSuchObject";
    pub const DBUS_SERVICE_UNKNOWN: &str = "org.freedesktop.DBus.Error.ServiceUnknown";
    pub const DBUS_EXEC_FAILED: &str = "org.freedesktop.DBus.Error.Spawn.ExecFailed";
    pub const DBUS_NO_REPLY: &str = "org.freedesktop.DBus.Error.NoReply";
    pub const DBUS_NOT_SUPPORTED: &str = "org.freedesktop.DBus.Error.NotSupported";
}
