use crate::{
    constants::{BUS_NAME, DBUS_IFACE, DBUS_NAME, DBUS_PATH, PROMPT_IFACE},
    error::Result,
    message::{BusAddress, ObjectPath, Value},
    proxy::ServiceProxy,
    traits::Connection,
};

/// A bus match rule, which asks the message bus to route matching messages to this connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchRule {
    #[allow(missing_docs)]
    pub message_type: Option<String>,
    #[allow(missing_docs)]
    pub sender: Option<String>,
    #[allow(missing_docs)]
    pub interface: Option<String>,
    #[allow(missing_docs)]
    pub member: Option<String>,
    #[allow(missing_docs)]
    pub path: Option<ObjectPath>,
}

impl MatchRule {
    /// Every signal emitted by a Secret Service prompt.
    pub fn prompt_signals() -> Self {
        MatchRule {
            message_type: Some("signal".to_string()),
            sender: Some(BUS_NAME.to_string()),
            interface: Some(PROMPT_IFACE.to_string()),
            ..Default::default()
        }
    }

    /// The textual form understood by `AddMatch`, e.g. `type='signal',sender='...'`.
    pub fn serialize(&self) -> String {
        [
            ("type", self.message_type.as_deref()),
            ("sender", self.sender.as_deref()),
            ("interface", self.interface.as_deref()),
            ("member", self.member.as_deref()),
            ("path", self.path.as_ref().map(ObjectPath::as_str)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| format!("{key}='{}'", escape(value))))
        .collect::<Vec<_>>()
        .join(",")
    }
}

// Single quotes end the quoted value, so they are written as '\''.
fn escape(value: &str) -> String {
    value.replace('\'', r"'\''")
}

/// Ask the message bus to deliver Secret Service prompt signals to `connection`.
///
/// Must run once per connection before any prompt is shown.
pub async fn add_match_rules<C: Connection>(connection: &C) -> Result<()> {
    let rule = MatchRule::prompt_signals().serialize();
    log::debug!("Adding match rule {rule}");

    ServiceProxy::new(connection, BusAddress::new(DBUS_NAME, DBUS_PATH, DBUS_IFACE))
        .call("AddMatch", "s", vec![Value::from(rule)])
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SecretServiceError,
        proxy::tests::{error_reply, ScriptedConnection},
    };

    #[test]
    fn serializes_prompt_rule() {
        assert_eq!(
            MatchRule::prompt_signals().serialize(),
            "type='signal',sender='org.freedesktop.secrets',interface='org.freedesktop.Secret.Prompt'"
        );
    }

    #[test]
    fn serializes_path_and_member() {
        let rule = MatchRule {
            member: Some("Completed".to_string()),
            path: Some(ObjectPath::new("/org/freedesktop/secrets/prompt/p1")),
            ..MatchRule::prompt_signals()
        };

        assert_eq!(
            rule.serialize(),
            "type='signal',sender='org.freedesktop.secrets',interface='org.freedesktop.Secret.Prompt',\
             member='Completed',path='/org/freedesktop/secrets/prompt/p1'"
        );
    }

    #[test]
    fn escapes_quotes() {
        let rule = MatchRule {
            member: Some("it's".to_string()),
            ..Default::default()
        };

        assert_eq!(rule.serialize(), r"member='it'\''s'");
    }

    #[test]
    fn empty_rule_is_empty() {
        assert_eq!(MatchRule::default().serialize(), "");
    }

    #[tokio::test]
    async fn installs_rule_on_the_bus() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]);

        add_match_rules(&connection).await.unwrap();

        let calls = connection.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].destination, DBUS_NAME);
        assert_eq!(calls[0].path, ObjectPath::new(DBUS_PATH));
        assert_eq!(calls[0].interface, DBUS_IFACE);
        assert_eq!(calls[0].member, "AddMatch");
        assert_eq!(calls[0].signature, "s");
        assert_eq!(
            calls[0].body,
            vec![Value::from(MatchRule::prompt_signals().serialize())]
        );
    }

    #[tokio::test]
    async fn propagates_bus_errors() {
        let connection = ScriptedConnection::new(vec![Err(error_reply(
            "org.freedesktop.DBus.Error.MatchRuleInvalid",
            vec![],
        ))]);

        let result = add_match_rules(&connection).await;

        assert!(matches!(result, Err(SecretServiceError::Transport(_))));
    }
}
