//! An in-memory Secret Service for testing the `secretstorage` protocol engine.
//!
//! [`MockSecretService`] implements [`Connection`] and answers the subset of the Secret Service
//! API the engine uses: `AddMatch`, `OpenSession`, `Unlock`, `Prompt` and property access.

#![allow(missing_docs)]

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use secretstorage::{
    constants::{
        errors::{DBUS_NOT_SUPPORTED, DBUS_NO_SUCH_OBJECT, DBUS_SERVICE_UNKNOWN, DBUS_UNKNOWN_METHOD},
        ALGORITHM_DH, ALGORITHM_PLAIN, BUS_NAME, DBUS_IFACE, PROMPT_COMPLETED, PROMPT_IFACE,
        PROPERTIES_IFACE, SERVICE_IFACE, SS_PATH, SS_PREFIX,
    },
    traits::{Connection, TransportError},
    MethodCall, ObjectPath, Secret, Signal, SignalRouter, Value,
};
use secretstorage_crypto::{Aes128CbcKey, DhKeyPair};
use tokio::sync::RwLock;

const INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";

/// When the mock emits the `Completed` signal of a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptMode {
    /// Emit the signal while handling the `Prompt` call, before its reply is returned.
    CompleteBeforeReply { dismissed: bool },
    /// Emit the signal from a separate task after the `Prompt` call returned.
    CompleteAfterReply { dismissed: bool },
    /// Only emit the signal when [`MockSecretService::complete_prompt`] is called.
    Manual,
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Whether `OpenSession` accepts the DH algorithm.
    pub dh_supported: bool,
    /// Objects that can only be unlocked through a prompt.
    pub locked: Vec<ObjectPath>,
    pub prompt_mode: PromptMode,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dh_supported: true,
            locked: Vec::new(),
            prompt_mode: PromptMode::CompleteAfterReply { dismissed: false },
        }
    }
}

struct PendingPrompt {
    unlocks: Vec<ObjectPath>,
}

struct State {
    config: MockConfig,
    available: bool,
    closed: bool,
    next_id: u32,
    sessions: HashMap<ObjectPath, Option<Aes128CbcKey>>,
    locked: HashSet<ObjectPath>,
    prompts: HashMap<ObjectPath, PendingPrompt>,
    labels: HashMap<ObjectPath, String>,
    injected_errors: HashMap<String, TransportError>,
    calls: Vec<MethodCall>,
    match_rules: Vec<String>,
    invoked_prompts: Vec<ObjectPath>,
}

struct Inner {
    router: SignalRouter,
    state: RwLock<State>,
}

// A reply together with the signals to emit before it is returned.
struct Handled {
    reply: Result<Vec<Value>, TransportError>,
    signals: Vec<Signal>,
}

impl Handled {
    fn reply(reply: Result<Vec<Value>, TransportError>) -> Self {
        Handled {
            reply,
            signals: Vec::new(),
        }
    }
}

/// A mock Secret Service. Clones share the same state and router.
#[derive(Clone)]
pub struct MockSecretService {
    inner: Arc<Inner>,
}

impl Default for MockSecretService {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockSecretService {
    pub fn new(config: MockConfig) -> Self {
        let locked = config.locked.iter().cloned().collect();
        MockSecretService {
            inner: Arc::new(Inner {
                router: SignalRouter::new(),
                state: RwLock::new(State {
                    config,
                    available: true,
                    closed: false,
                    next_id: 0,
                    sessions: HashMap::new(),
                    locked,
                    prompts: HashMap::new(),
                    labels: HashMap::new(),
                    injected_errors: HashMap::new(),
                    calls: Vec::new(),
                    match_rules: Vec::new(),
                    invoked_prompts: Vec::new(),
                }),
            }),
        }
    }

    /// Every method call received so far.
    pub async fn calls(&self) -> Vec<MethodCall> {
        self.inner.state.read().await.calls.clone()
    }

    /// Names of the methods called so far, in order.
    pub async fn call_members(&self) -> Vec<String> {
        self.inner
            .state
            .read()
            .await
            .calls
            .iter()
            .map(|call| call.member.clone())
            .collect()
    }

    pub async fn match_rules(&self) -> Vec<String> {
        self.inner.state.read().await.match_rules.clone()
    }

    /// Prompts the client called `Prompt` on, in order.
    pub async fn invoked_prompts(&self) -> Vec<ObjectPath> {
        self.inner.state.read().await.invoked_prompts.clone()
    }

    /// The pending prompt that unlocks `path`, if any.
    pub async fn pending_prompt_for(&self, path: &ObjectPath) -> Option<ObjectPath> {
        self.inner
            .state
            .read()
            .await
            .prompts
            .iter()
            .find(|(_, pending)| pending.unlocks.contains(path))
            .map(|(prompt, _)| prompt.clone())
    }

    pub async fn is_locked(&self, path: &ObjectPath) -> bool {
        self.inner.state.read().await.locked.contains(path)
    }

    pub async fn is_encrypted_session(&self, session: &ObjectPath) -> Option<bool> {
        self.inner
            .state
            .read()
            .await
            .sessions
            .get(session)
            .map(Option::is_some)
    }

    pub async fn label(&self, path: &ObjectPath) -> Option<String> {
        self.inner.state.read().await.labels.get(path).cloned()
    }

    pub async fn set_label(&self, path: ObjectPath, label: impl Into<String>) {
        self.inner
            .state
            .write()
            .await
            .labels
            .insert(path, label.into());
    }

    pub async fn set_prompt_mode(&self, mode: PromptMode) {
        self.inner.state.write().await.config.prompt_mode = mode;
    }

    /// While unavailable, every call to the Secret Service fails as if it was not running.
    pub async fn set_available(&self, available: bool) {
        self.inner.state.write().await.available = available;
    }

    /// Answer the next call of `member` with `error`.
    pub async fn fail_next(&self, member: impl Into<String>, error: TransportError) {
        self.inner
            .state
            .write()
            .await
            .injected_errors
            .insert(member.into(), error);
    }

    /// Dispatch an arbitrary signal to the client.
    pub async fn emit(&self, signal: Signal) -> usize {
        self.inner.router.dispatch(&signal).await
    }

    /// Complete a pending prompt. Returns the number of subscriptions the signal reached.
    pub async fn complete_prompt(&self, prompt: &ObjectPath, dismissed: bool) -> usize {
        let signal = self.inner.state.write().await.complete(prompt, dismissed);
        match signal {
            Some(signal) => self.emit(signal).await,
            None => 0,
        }
    }

    /// Decode a secret sent by the client, as the service would.
    pub async fn decode_secret(&self, secret: &Secret) -> Option<Vec<u8>> {
        let state = self.inner.state.read().await;
        match state.sessions.get(&secret.session)? {
            None => Some(secret.value.clone()),
            Some(key) => key.decrypt(&secret.parameters, &secret.value).ok(),
        }
    }

    /// Encode a secret for the client, as the service would.
    pub async fn encode_secret(
        &self,
        session: &ObjectPath,
        plaintext: &[u8],
        content_type: &str,
    ) -> Option<Secret> {
        let state = self.inner.state.read().await;
        let (parameters, value) = match state.sessions.get(session)? {
            None => (Vec::new(), plaintext.to_vec()),
            Some(key) => {
                let (iv, ciphertext) = key.encrypt(plaintext);
                (iv.to_vec(), ciphertext)
            }
        };
        Some(Secret {
            session: session.clone(),
            parameters,
            value,
            content_type: content_type.to_string(),
        })
    }

    async fn handle(&self, message: MethodCall) -> Handled {
        let mut state = self.inner.state.write().await;
        state.calls.push(message.clone());

        if state.closed {
            return Handled::reply(Err(TransportError::Disconnected));
        }
        if let Some(error) = state.injected_errors.remove(&message.member) {
            return Handled::reply(Err(error));
        }
        if message.destination == BUS_NAME && !state.available {
            return Handled::reply(Err(error_reply(
                DBUS_SERVICE_UNKNOWN,
                "The name org.freedesktop.secrets was not provided by any .service files",
            )));
        }

        let reply = match (message.interface.as_str(), message.member.as_str()) {
            (DBUS_IFACE, "AddMatch") => match message.body.as_slice() {
                [Value::Str(rule)] => {
                    state.match_rules.push(rule.clone());
                    Ok(vec![])
                }
                _ => Err(error_reply(INVALID_ARGS, "AddMatch expects a rule")),
            },
            (SERVICE_IFACE, "OpenSession") if message.path.as_str() == SS_PATH => {
                state.open_session(&message.body)
            }
            (SERVICE_IFACE, "Unlock") if message.path.as_str() == SS_PATH => {
                state.unlock(&message.body)
            }
            (PROMPT_IFACE, "Prompt") => return self.prompt(&mut state, message.path),
            (PROPERTIES_IFACE, "Get") => state.get_property(&message.path, &message.body),
            (PROPERTIES_IFACE, "Set") => state.set_property(&message.path, &message.body),
            (interface, member) => Err(error_reply(
                DBUS_UNKNOWN_METHOD,
                &format!("No such method {member} on {interface}"),
            )),
        };
        Handled::reply(reply)
    }

    fn prompt(&self, state: &mut State, path: ObjectPath) -> Handled {
        if !state.prompts.contains_key(&path) {
            return Handled::reply(Err(error_reply(DBUS_NO_SUCH_OBJECT, "No such prompt")));
        }
        state.invoked_prompts.push(path.clone());

        match state.config.prompt_mode {
            PromptMode::CompleteBeforeReply { dismissed } => Handled {
                reply: Ok(vec![]),
                signals: state.complete(&path, dismissed).into_iter().collect(),
            },
            PromptMode::CompleteAfterReply { dismissed } => {
                let service = self.clone();
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    service.complete_prompt(&path, dismissed).await;
                });
                Handled::reply(Ok(vec![]))
            }
            PromptMode::Manual => Handled::reply(Ok(vec![])),
        }
    }
}

impl State {
    fn next_path(&mut self, kind: &str) -> ObjectPath {
        self.next_id += 1;
        ObjectPath::new(format!("{SS_PATH}/{kind}/{kind}{}", self.next_id))
    }

    fn open_session(&mut self, body: &[Value]) -> Result<Vec<Value>, TransportError> {
        let (algorithm, input) = match body {
            [Value::Str(algorithm), Value::Variant(input)] => (algorithm.as_str(), input.as_ref()),
            _ => return Err(error_reply(INVALID_ARGS, "OpenSession expects (sv)")),
        };

        match (algorithm, input) {
            (ALGORITHM_PLAIN, _) => {
                let path = self.next_path("session");
                self.sessions.insert(path.clone(), None);
                log::debug!("Mock service opened plain session {path}");
                Ok(vec![Value::variant(""), Value::ObjectPath(path)])
            }
            (ALGORITHM_DH, Value::Bytes(client_public_key)) if self.config.dh_supported => {
                let key_pair = DhKeyPair::generate(rand::thread_rng());
                let key = key_pair
                    .derive_session_key(client_public_key)
                    .map_err(|e| error_reply(INVALID_ARGS, &e.to_string()))?;
                let path = self.next_path("session");
                self.sessions.insert(path.clone(), Some(key));
                log::debug!("Mock service opened encrypted session {path}");
                Ok(vec![
                    Value::variant(Value::Bytes(key_pair.public_key_bytes())),
                    Value::ObjectPath(path),
                ])
            }
            (algorithm, _) => Err(error_reply(
                DBUS_NOT_SUPPORTED,
                &format!("Algorithm {algorithm} is not supported"),
            )),
        }
    }

    fn unlock(&mut self, body: &[Value]) -> Result<Vec<Value>, TransportError> {
        let paths = body
            .first()
            .and_then(Value::object_paths)
            .ok_or_else(|| error_reply(INVALID_ARGS, "Unlock expects (ao)"))?;

        let (needs_prompt, unlocked): (Vec<_>, Vec<_>) =
            paths.into_iter().partition(|path| self.locked.contains(path));

        let prompt = if needs_prompt.is_empty() {
            ObjectPath::root()
        } else {
            let prompt = self.next_path("prompt");
            self.prompts.insert(
                prompt.clone(),
                PendingPrompt {
                    unlocks: needs_prompt,
                },
            );
            prompt
        };

        Ok(vec![
            Value::object_path_array(&unlocked),
            Value::ObjectPath(prompt),
        ])
    }

    // Resolves a pending prompt and builds its Completed signal.
    fn complete(&mut self, prompt: &ObjectPath, dismissed: bool) -> Option<Signal> {
        let pending = self.prompts.remove(prompt)?;

        let result = if dismissed {
            Vec::new()
        } else {
            for path in &pending.unlocks {
                self.locked.remove(path);
            }
            pending.unlocks
        };

        Some(completed_signal(prompt.clone(), dismissed, &result))
    }

    fn get_property(
        &self,
        path: &ObjectPath,
        body: &[Value],
    ) -> Result<Vec<Value>, TransportError> {
        match body {
            [Value::Str(interface), Value::Str(name)]
                if interface.starts_with(SS_PREFIX) && name == "Label" =>
            {
                self.labels
                    .get(path)
                    .map(|label| vec![Value::variant(label.as_str())])
                    .ok_or_else(|| error_reply(DBUS_NO_SUCH_OBJECT, "No such object"))
            }
            _ => Err(error_reply(INVALID_ARGS, "Unknown property")),
        }
    }

    fn set_property(
        &mut self,
        path: &ObjectPath,
        body: &[Value],
    ) -> Result<Vec<Value>, TransportError> {
        match body {
            [Value::Str(interface), Value::Str(name), Value::Variant(value)]
                if interface.starts_with(SS_PREFIX) && name == "Label" =>
            {
                match (self.labels.get_mut(path), value.as_ref()) {
                    (Some(label), Value::Str(value)) => {
                        *label = value.clone();
                        Ok(vec![])
                    }
                    (None, _) => Err(error_reply(DBUS_NO_SUCH_OBJECT, "No such object")),
                    (Some(_), _) => Err(error_reply(INVALID_ARGS, "Label must be a string")),
                }
            }
            _ => Err(error_reply(INVALID_ARGS, "Unknown property")),
        }
    }
}

impl Connection for MockSecretService {
    async fn call(&self, message: MethodCall) -> Result<Vec<Value>, TransportError> {
        let Handled { reply, signals } = self.handle(message).await;
        for signal in &signals {
            self.inner.router.dispatch(signal).await;
        }
        reply
    }

    fn router(&self) -> &SignalRouter {
        &self.inner.router
    }

    async fn close(&self) {
        self.inner.state.write().await.closed = true;
    }
}

/// A `Completed` signal for `prompt`.
pub fn completed_signal(prompt: ObjectPath, dismissed: bool, result: &[ObjectPath]) -> Signal {
    Signal {
        sender: BUS_NAME.to_string(),
        path: prompt,
        interface: PROMPT_IFACE.to_string(),
        member: PROMPT_COMPLETED.to_string(),
        body: vec![
            Value::Bool(dismissed),
            Value::variant(Value::object_path_array(result)),
        ],
    }
}

pub fn error_reply(name: &str, message: &str) -> TransportError {
    TransportError::ErrorReply {
        name: name.to_string(),
        body: vec![Value::from(message)],
    }
}
