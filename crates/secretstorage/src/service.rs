use crate::{
    error::{Result, SecretServiceError},
    match_rule::add_match_rules,
    message::ObjectPath,
    prompt::{PromptCoordinator, PromptOutcome},
    proxy::ServiceProxy,
    secret::Secret,
    session::{open_session, Session},
    settings::SecretServiceSettings,
    traits::Connection,
};

/// Entry point to the Secret Service on a single bus connection.
///
/// The connection is owned by the service. It may be shared between tasks by reference; every
/// operation only needs `&self`.
pub struct SecretService<C>
where
    C: Connection,
{
    connection: C,
    settings: SecretServiceSettings,
}

impl<C> SecretService<C>
where
    C: Connection,
{
    /// Prepare `connection` for use with the Secret Service.
    ///
    /// Installs the match rule for prompt signals. Failing to reach the bus is reported as
    /// [`SecretServiceError::ServiceUnavailable`].
    pub async fn new(connection: C, settings: SecretServiceSettings) -> Result<Self> {
        add_match_rules(&connection)
            .await
            .map_err(SecretServiceError::unavailable_if_disconnected)?;

        Ok(Self {
            connection,
            settings,
        })
    }

    #[allow(missing_docs)]
    pub fn connection(&self) -> &C {
        &self.connection
    }

    #[allow(missing_docs)]
    pub fn settings(&self) -> &SecretServiceSettings {
        &self.settings
    }

    /// A proxy for the top-level service object.
    pub fn service_proxy(&self) -> ServiceProxy<'_, C> {
        ServiceProxy::service(&self.connection)
    }

    /// A prompt coordinator using the configured prompt timeout.
    pub fn prompts(&self) -> PromptCoordinator<'_, C> {
        PromptCoordinator::new(&self.connection).with_timeout(self.settings.prompt_timeout())
    }

    /// Negotiate a transport session, preferring an encrypted one.
    pub async fn open_session(&self) -> Result<Session> {
        open_session(&self.connection).await
    }

    /// Encode `plaintext` for `session` with the configured content type.
    pub fn encode_secret(&self, session: &Session, plaintext: impl AsRef<[u8]>) -> Secret {
        Secret::encode(session, plaintext, &self.settings.content_type)
    }

    /// Unlock `paths`, returning `true` if the user dismissed the prompt.
    pub async fn unlock(&self, paths: &[ObjectPath]) -> Result<bool> {
        self.prompts().unlock(paths).await
    }

    /// Show the prompt at `prompt_path` and wait for it to complete.
    pub async fn exec_prompt(&self, prompt_path: &ObjectPath) -> Result<PromptOutcome> {
        self.prompts().exec_prompt(prompt_path).await
    }

    /// Close the connection.
    pub async fn close(self) {
        log::debug!("Closing Secret Service connection");
        self.connection.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{errors::DBUS_SERVICE_UNKNOWN, DBUS_NAME},
        message::Value,
        proxy::tests::{error_reply, ScriptedConnection},
    };

    #[tokio::test]
    async fn new_installs_match_rule() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]);

        let service = SecretService::new(connection, SecretServiceSettings::default())
            .await
            .unwrap();

        let calls = service.connection().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].destination, DBUS_NAME);
        assert_eq!(calls[0].member, "AddMatch");
    }

    #[tokio::test]
    async fn new_reports_unreachable_bus_as_unavailable() {
        // No scripted replies, so the connection reports itself as disconnected.
        let connection = ScriptedConnection::new(vec![]);

        let result = SecretService::new(connection, SecretServiceSettings::default()).await;

        assert!(matches!(
            result,
            Err(SecretServiceError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn new_translates_error_replies() {
        let connection = ScriptedConnection::new(vec![Err(error_reply(
            DBUS_SERVICE_UNKNOWN,
            vec![Value::from("bus is gone")],
        ))]);

        let result = SecretService::new(connection, SecretServiceSettings::default()).await;

        assert!(matches!(
            result,
            Err(SecretServiceError::ServiceUnavailable(message)) if message == "bus is gone"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn prompts_use_configured_timeout() {
        let connection = ScriptedConnection::new(vec![Ok(vec![]), Ok(vec![])]);
        let settings = SecretServiceSettings {
            prompt_timeout_ms: Some(250),
            ..Default::default()
        };
        let service = SecretService::new(connection, settings).await.unwrap();

        let result = service
            .exec_prompt(&ObjectPath::new("/org/freedesktop/secrets/prompt/p1"))
            .await;

        assert!(matches!(
            result,
            Err(SecretServiceError::PromptTimeout(timeout))
                if timeout == std::time::Duration::from_millis(250)
        ));
    }

    #[tokio::test]
    async fn encode_secret_uses_configured_content_type() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]);
        let settings = SecretServiceSettings {
            content_type: "application/octet-stream".to_string(),
            ..Default::default()
        };
        let service = SecretService::new(connection, settings).await.unwrap();

        let secret = service.encode_secret(&crate::session::tests::plain_session(), [1u8, 2, 3]);

        assert_eq!(secret.content_type, "application/octet-stream");
        assert_eq!(secret.value, vec![1, 2, 3]);
    }
}
