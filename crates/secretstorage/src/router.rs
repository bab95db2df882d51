//! Dispatch of incoming signals to the tasks waiting for them.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use crate::message::{ObjectPath, Signal};

/// Selects the signals a subscription receives. All three fields must match exactly, so a
/// subscription for one prompt object never sees the signals of another.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignalMatch {
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
}

impl SignalMatch {
    #[allow(missing_docs)]
    pub fn new(path: ObjectPath, interface: impl Into<String>, member: impl Into<String>) -> Self {
        SignalMatch {
            path,
            interface: interface.into(),
            member: member.into(),
        }
    }

    #[allow(missing_docs)]
    pub fn matches(&self, signal: &Signal) -> bool {
        self.path == signal.path && self.interface == signal.interface && self.member == signal.member
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReceiveError {
    #[error("The connection was dropped before the signal arrived")]
    Closed,

    #[error("Timed out while waiting for a signal: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

struct Subscriber {
    rule: SignalMatch,
    sender: mpsc::UnboundedSender<Signal>,
}

/// Routes incoming signals to subscriptions.
///
/// The transport calls [`SignalRouter::dispatch`] for every signal it reads. Subscriptions buffer
/// matching signals from the moment they are created, so subscribing before issuing the call that
/// triggers a signal guarantees the signal is not missed.
#[derive(Default)]
pub struct SignalRouter {
    subscribers: RwLock<Vec<Subscriber>>,
    subscriptions_created: AtomicUsize,
}

impl SignalRouter {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start buffering signals that match `rule`. Dropping the subscription unsubscribes.
    pub async fn subscribe(&self, rule: SignalMatch) -> SignalSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        log::trace!(
            "Subscribing to {}.{} on {}",
            rule.interface,
            rule.member,
            rule.path
        );
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|subscriber| !subscriber.sender.is_closed());
        subscribers.push(Subscriber {
            rule: rule.clone(),
            sender,
        });
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
        SignalSubscription { receiver, rule }
    }

    /// Deliver `signal` to every live subscription that matches it. Returns the number of
    /// subscriptions it was delivered to.
    pub async fn dispatch(&self, signal: &Signal) -> usize {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|subscriber| !subscriber.sender.is_closed());

        let delivered = subscribers
            .iter()
            .filter(|subscriber| subscriber.rule.matches(signal))
            .filter(|subscriber| subscriber.sender.send(signal.clone()).is_ok())
            .count();

        if delivered == 0 {
            log::trace!(
                "Dropping signal {}.{} on {}, nobody is subscribed",
                signal.interface,
                signal.member,
                signal.path
            );
        }
        delivered
    }

    /// Number of subscriptions created over the lifetime of the router, including dropped ones.
    pub fn subscriptions_created(&self) -> usize {
        self.subscriptions_created.load(Ordering::Relaxed)
    }

    /// Number of live subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|subscriber| !subscriber.sender.is_closed());
        subscribers.len()
    }
}

/// A subscription created by [`SignalRouter::subscribe`].
pub struct SignalSubscription {
    receiver: mpsc::UnboundedReceiver<Signal>,
    rule: SignalMatch,
}

impl SignalSubscription {
    #[allow(missing_docs)]
    pub fn rule(&self) -> &SignalMatch {
        &self.rule
    }

    /// Receive the next matching signal.
    /// Setting the timeout to `None` will wait indefinitely.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Result<Signal, ReceiveError> {
        let received = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.receiver.recv()).await?,
            None => self.receiver.recv().await,
        };
        received.ok_or(ReceiveError::Closed)
    }
}
