//! Execution of prompts and the prompt-gated unlock operation.

use std::time::Duration;

use crate::{
    constants::{PROMPT_COMPLETED, PROMPT_IFACE},
    error::{Result, SecretServiceError},
    message::{ObjectPath, Signal, Value},
    proxy::ServiceProxy,
    router::{ReceiveError, SignalMatch, SignalSubscription},
    traits::Connection,
};

/// Result of a completed prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptOutcome {
    /// Whether the user dismissed the prompt.
    pub dismissed: bool,
    /// Object paths the prompt produced. Empty if the prompt result carries none.
    pub result_paths: Vec<ObjectPath>,
}

impl TryFrom<Signal> for PromptOutcome {
    type Error = SecretServiceError;

    fn try_from(signal: Signal) -> Result<Self> {
        let mut body = signal.body.into_iter();
        match (body.next(), body.next()) {
            (Some(Value::Bool(dismissed)), Some(result)) => Ok(PromptOutcome {
                dismissed,
                result_paths: result.into_variant_inner().object_paths().unwrap_or_default(),
            }),
            _ => Err(SecretServiceError::Protocol(format!(
                "{PROMPT_COMPLETED} signal on {} is not (bv)",
                signal.path
            ))),
        }
    }
}

// A request that may need the user's consent.
enum PrivilegedRequest {
    Unlock(Vec<ObjectPath>),
    Prompt(ObjectPath),
}

// `Idle` has not contacted the service yet. Issuing the request either completes it directly or
// shows a prompt, which subscribes to the prompt's completion signal first.
enum PromptState {
    Idle(PrivilegedRequest),
    AwaitingPrompt {
        path: ObjectPath,
        subscription: SignalSubscription,
    },
    Done(PromptOutcome),
}

/// Drives prompts to completion on a [`Connection`].
///
/// Several coordinators, or several prompts on one coordinator, may be in flight on the same
/// connection. Each prompt only ever observes the completion signal of its own object path.
pub struct PromptCoordinator<'a, C>
where
    C: Connection,
{
    connection: &'a C,
    timeout: Option<Duration>,
}

impl<'a, C> PromptCoordinator<'a, C>
where
    C: Connection,
{
    /// Create a coordinator that waits for prompts indefinitely.
    pub fn new(connection: &'a C) -> Self {
        Self {
            connection,
            timeout: None,
        }
    }

    /// Give up waiting for a prompt after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Show the prompt at `prompt_path` and wait until it completes.
    ///
    /// The subscription for the completion signal is in place before the prompt is shown, so a
    /// signal that arrives before the reply to the `Prompt` call is not lost.
    pub async fn exec_prompt(&self, prompt_path: &ObjectPath) -> Result<PromptOutcome> {
        self.run(PromptState::Idle(PrivilegedRequest::Prompt(
            prompt_path.clone(),
        )))
        .await
    }

    /// Like [`PromptCoordinator::exec_prompt`], but a dismissed prompt is an error.
    pub async fn exec_prompt_checked(&self, prompt_path: &ObjectPath) -> Result<PromptOutcome> {
        let outcome = self.exec_prompt(prompt_path).await?;
        if outcome.dismissed {
            return Err(SecretServiceError::PromptDismissed);
        }
        Ok(outcome)
    }

    /// Ask the service to unlock `paths`, showing a prompt if it requests one.
    ///
    /// Returns `true` if the user dismissed the prompt. When the service unlocks the objects
    /// without a prompt no signal is waited for and `false` is returned.
    pub async fn unlock(&self, paths: &[ObjectPath]) -> Result<bool> {
        let outcome = self
            .run(PromptState::Idle(PrivilegedRequest::Unlock(paths.to_vec())))
            .await?;
        Ok(outcome.dismissed)
    }

    async fn issue(&self, request: PrivilegedRequest) -> Result<PromptState> {
        let paths = match request {
            PrivilegedRequest::Prompt(path) => return self.show_prompt(path).await,
            PrivilegedRequest::Unlock(paths) => paths,
        };

        let reply = ServiceProxy::service(self.connection)
            .call("Unlock", "ao", vec![Value::object_path_array(&paths)])
            .await?;

        let mut reply = reply.into_iter();
        let (unlocked, prompt) = match (reply.next(), reply.next()) {
            (Some(unlocked), Some(Value::ObjectPath(prompt))) => (unlocked, prompt),
            _ => {
                return Err(SecretServiceError::Protocol(
                    "Unlock did not return (unlocked, prompt)".to_string(),
                ))
            }
        };

        if prompt.is_root_or_empty() {
            log::debug!("Unlocked {} object(s) without a prompt", paths.len());
            return Ok(PromptState::Done(PromptOutcome {
                dismissed: false,
                result_paths: unlocked.object_paths().unwrap_or_default(),
            }));
        }
        self.show_prompt(prompt).await
    }

    async fn show_prompt(&self, path: ObjectPath) -> Result<PromptState> {
        let subscription = self
            .connection
            .router()
            .subscribe(SignalMatch::new(path.clone(), PROMPT_IFACE, PROMPT_COMPLETED))
            .await;

        // The window id is left empty.
        ServiceProxy::prompt(self.connection, path.clone())
            .call("Prompt", "s", vec![Value::from("")])
            .await?;

        log::debug!("Waiting for prompt {path} to complete");
        Ok(PromptState::AwaitingPrompt { path, subscription })
    }

    async fn run(&self, mut state: PromptState) -> Result<PromptOutcome> {
        loop {
            state = match state {
                PromptState::Idle(request) => self.issue(request).await?,
                PromptState::AwaitingPrompt {
                    path,
                    mut subscription,
                } => {
                    let signal = subscription
                        .receive(self.timeout)
                        .await
                        .map_err(|e| match e {
                            ReceiveError::Timeout(_) => SecretServiceError::PromptTimeout(
                                self.timeout.unwrap_or_default(),
                            ),
                            ReceiveError::Closed => SecretServiceError::ServiceUnavailable(
                                format!("Connection closed while waiting for prompt {path}"),
                            ),
                        })?;

                    let outcome = PromptOutcome::try_from(signal)?;
                    log::debug!(
                        "Prompt {path} completed, dismissed: {}",
                        outcome.dismissed
                    );
                    PromptState::Done(outcome)
                }
                PromptState::Done(outcome) => return Ok(outcome),
            }
        }
    }
}

/// Show the prompt at `prompt_path` on `connection` and wait for it without a timeout.
pub async fn exec_prompt<C: Connection>(
    connection: &C,
    prompt_path: &ObjectPath,
) -> Result<PromptOutcome> {
    PromptCoordinator::new(connection)
        .exec_prompt(prompt_path)
        .await
}

/// Unlock `paths` on `connection`, returning `true` if the prompt was dismissed.
pub async fn unlock_objects<C: Connection>(connection: &C, paths: &[ObjectPath]) -> Result<bool> {
    PromptCoordinator::new(connection).unlock(paths).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{errors::DBUS_NO_SUCH_OBJECT, BUS_NAME, SERVICE_IFACE},
        proxy::tests::{error_reply, ScriptedConnection},
    };

    const PROMPT_PATH: &str = "/org/freedesktop/secrets/prompt/p1";
    const LOGIN: &str = "/org/freedesktop/secrets/collection/login";

    fn completed(path: &str, dismissed: bool, result: Value) -> Signal {
        Signal {
            sender: BUS_NAME.to_string(),
            path: ObjectPath::new(path),
            interface: PROMPT_IFACE.to_string(),
            member: PROMPT_COMPLETED.to_string(),
            body: vec![Value::Bool(dismissed), Value::variant(result)],
        }
    }

    fn unlock_reply(prompt: &str) -> Vec<Value> {
        vec![
            Value::object_path_array(&[]),
            Value::ObjectPath(ObjectPath::new(prompt)),
        ]
    }

    #[tokio::test]
    async fn unlock_without_prompt_does_not_wait() {
        let connection = ScriptedConnection::new(vec![Ok(vec![
            Value::object_path_array(&[ObjectPath::new(LOGIN)]),
            Value::ObjectPath(ObjectPath::root()),
        ])]);

        let dismissed = unlock_objects(&connection, &[ObjectPath::new(LOGIN)])
            .await
            .unwrap();

        assert!(!dismissed);
        let calls = connection.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].interface, SERVICE_IFACE);
        assert_eq!(calls[0].member, "Unlock");
        assert_eq!(calls[0].signature, "ao");
        assert_eq!(
            calls[0].body,
            vec![Value::object_path_array(&[ObjectPath::new(LOGIN)])]
        );
        assert_eq!(connection.router().subscriptions_created(), 0);
    }

    #[tokio::test]
    async fn unlock_treats_empty_prompt_path_as_no_prompt() {
        for prompt in ["", "/"] {
            let connection = ScriptedConnection::new(vec![Ok(unlock_reply(prompt))]);

            let dismissed = unlock_objects(&connection, &[ObjectPath::new(LOGIN)])
                .await
                .unwrap();

            assert!(!dismissed);
            assert_eq!(connection.calls().len(), 1);
            assert_eq!(connection.router().subscriptions_created(), 0);
        }
    }

    #[tokio::test]
    async fn unlock_with_prompt_returns_dismissed_flag() {
        for dismissed in [false, true] {
            let connection =
                ScriptedConnection::new(vec![Ok(unlock_reply(PROMPT_PATH)), Ok(vec![])])
                    .with_signals(vec![
                        vec![],
                        vec![completed(
                            PROMPT_PATH,
                            dismissed,
                            Value::object_path_array(&[ObjectPath::new(LOGIN)]),
                        )],
                    ]);

            let result = unlock_objects(&connection, &[ObjectPath::new(LOGIN)])
                .await
                .unwrap();

            assert_eq!(result, dismissed);
            let calls = connection.calls();
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[1].path, ObjectPath::new(PROMPT_PATH));
            assert_eq!(calls[1].interface, PROMPT_IFACE);
            assert_eq!(calls[1].member, "Prompt");
            assert_eq!(calls[1].body, vec![Value::from("")]);
            assert_eq!(connection.router().subscriptions_created(), 1);
        }
    }

    #[tokio::test]
    async fn signal_before_reply_is_not_lost() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]).with_signals(vec![vec![
            completed(
                PROMPT_PATH,
                false,
                Value::object_path_array(&[ObjectPath::new(LOGIN)]),
            ),
        ]]);

        let outcome = exec_prompt(&connection, &ObjectPath::new(PROMPT_PATH))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PromptOutcome {
                dismissed: false,
                result_paths: vec![ObjectPath::new(LOGIN)],
            }
        );
    }

    #[tokio::test]
    async fn signal_after_reply_is_received() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]);
        let prompt_path = ObjectPath::new(PROMPT_PATH);

        let (outcome, delivered) = tokio::join!(exec_prompt(&connection, &prompt_path), async {
            while connection.calls().is_empty() {
                tokio::task::yield_now().await;
            }
            connection
                .router()
                .dispatch(&completed(PROMPT_PATH, true, Value::from("")))
                .await
        });

        assert_eq!(delivered, 1);
        assert_eq!(
            outcome.unwrap(),
            PromptOutcome {
                dismissed: true,
                result_paths: vec![],
            }
        );
    }

    #[tokio::test]
    async fn ignores_signals_for_other_prompts() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]).with_signals(vec![vec![
            completed("/org/freedesktop/secrets/prompt/other", true, Value::from("")),
            completed(PROMPT_PATH, false, Value::ObjectPath(ObjectPath::new(LOGIN))),
        ]]);

        let outcome = exec_prompt(&connection, &ObjectPath::new(PROMPT_PATH))
            .await
            .unwrap();

        assert!(!outcome.dismissed);
        assert_eq!(outcome.result_paths, vec![ObjectPath::new(LOGIN)]);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_no_signal_arrives() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]);
        let coordinator =
            PromptCoordinator::new(&connection).with_timeout(Some(Duration::from_secs(30)));

        let result = coordinator.exec_prompt(&ObjectPath::new(PROMPT_PATH)).await;

        assert!(matches!(
            result,
            Err(SecretServiceError::PromptTimeout(timeout)) if timeout == Duration::from_secs(30)
        ));
        assert_eq!(connection.router().subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn checked_prompt_fails_when_dismissed() {
        let connection = ScriptedConnection::new(vec![Ok(vec![])]).with_signals(vec![vec![
            completed(PROMPT_PATH, true, Value::from("")),
        ]]);

        let result = PromptCoordinator::new(&connection)
            .exec_prompt_checked(&ObjectPath::new(PROMPT_PATH))
            .await;

        assert!(matches!(result, Err(SecretServiceError::PromptDismissed)));
    }

    #[tokio::test]
    async fn prompt_call_errors_are_translated() {
        let connection =
            ScriptedConnection::new(vec![Err(error_reply(DBUS_NO_SUCH_OBJECT, vec![]))]);

        let result = exec_prompt(&connection, &ObjectPath::new(PROMPT_PATH)).await;

        assert!(matches!(result, Err(SecretServiceError::ItemNotFound)));
    }

    #[tokio::test]
    async fn malformed_unlock_reply_is_protocol_error() {
        let connection =
            ScriptedConnection::new(vec![Ok(vec![Value::object_path_array(&[])])]);

        let result = unlock_objects(&connection, &[ObjectPath::new(LOGIN)]).await;

        assert!(matches!(result, Err(SecretServiceError::Protocol(_))));
    }

    #[test]
    fn malformed_completed_signal_is_protocol_error() {
        let mut signal = completed(PROMPT_PATH, false, Value::from(""));
        signal.body.remove(0);

        assert!(matches!(
            PromptOutcome::try_from(signal),
            Err(SecretServiceError::Protocol(_))
        ));
    }
}
