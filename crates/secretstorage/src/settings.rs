use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Behavior settings of a [`SecretService`](crate::SecretService). They are optional and cannot
/// be changed once the service is created.
///
/// Defaults to
///
/// ```
/// # use secretstorage::SecretServiceSettings;
/// let settings = SecretServiceSettings {
///     prompt_timeout_ms: None,
///     content_type: "text/plain; charset=utf8".to_string(),
/// };
/// assert_eq!(settings, SecretServiceSettings::default());
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretServiceSettings {
    /// How long to wait for the user to answer a prompt, in milliseconds. Defaults to waiting
    /// indefinitely.
    pub prompt_timeout_ms: Option<u64>,
    /// Content type attached to secrets encoded by the service. Defaults to
    /// `text/plain; charset=utf8`
    pub content_type: String,
}

impl SecretServiceSettings {
    #[allow(missing_docs)]
    pub fn prompt_timeout(&self) -> Option<Duration> {
        self.prompt_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for SecretServiceSettings {
    fn default() -> Self {
        Self {
            prompt_timeout_ms: None,
            content_type: "text/plain; charset=utf8".into(),
        }
    }
}
