//! Events crossing the transport boundary and link observability events.

use crate::state::ConnectionState;

/// Asynchronous event delivered by the transport collaborator.
///
/// The enum is non-exhaustive on purpose: the manager folds any event it
/// does not recognize into the error path.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted the session.
    Connected,
    /// The session ended.
    Disconnected,
    /// The transport reported a fault.
    Error,
}

/// Inbound pub/sub message delivered by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Observability event emitted by the connection manager.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// The link state machine moved (or re-asserted) a state.
    StateChanged {
        old: ConnectionState,
        new: ConnectionState,
        timestamp: i64,
    },
}

impl LinkEvent {
    /// Build a state-change event stamped with the current wall clock.
    pub fn state_changed(old: ConnectionState, new: ConnectionState) -> Self {
        Self::StateChanged {
            old,
            new,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
