//! Link connection state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the pub/sub session.
///
/// Exactly one instance exists per connection manager; it is mutated only
/// by the manager in response to connect attempts and transport events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session; the reconnect gate decides when to try again.
    #[default]
    Disconnected,
    /// A connect attempt has been issued and no result has arrived yet.
    Connecting,
    /// The broker accepted the session.
    Connected,
    /// Session established and command topics subscribed.
    Ready,
    /// The transport reported a fault. Recovery policy is identical to an
    /// ordinary disconnect.
    Error,
}

impl ConnectionState {
    /// Whether the session is usable for publishing.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Connected | Self::Ready)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Ready => write!(f, "ready"),
            Self::Error => write!(f, "error"),
        }
    }
}
