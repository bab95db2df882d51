use thiserror::Error;

use crate::{
    message::{MethodCall, Value},
    router::SignalRouter,
};

/// Failure reported by the transport for a single call.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The remote side answered with an error message.
    #[error("{name}: {body:?}")]
    ErrorReply { name: String, body: Vec<Value> },

    #[error("The connection to the bus is closed")]
    Disconnected,

    #[error("I/O error: {0}")]
    Io(String),
}

/// This trait defines the interface the protocol engine needs from a bus connection. It is up to
/// the platform to implement it on top of an actual message bus client.
///
/// The implementation needs to guarantee that:
///     - `call` may be invoked from any task at any time, and replies are matched to their calls.
///     - Every incoming signal is handed to [`SignalRouter::dispatch`] of the router returned by
///       `router`, including while calls are in flight.
pub trait Connection: Send + Sync {
    /// Send a method call and wait for its reply body.
    fn call(
        &self,
        message: MethodCall,
    ) -> impl std::future::Future<Output = Result<Vec<Value>, TransportError>> + Send;

    /// The router that incoming signals are dispatched through.
    fn router(&self) -> &SignalRouter;

    /// Close the underlying connection. Calls made afterwards fail with
    /// [`TransportError::Disconnected`].
    fn close(&self) -> impl std::future::Future<Output = ()> + Send;
}
