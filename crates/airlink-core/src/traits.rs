//! Collaborator traits at the boundary of the connectivity layer.
//!
//! The pub/sub transport, the radio/association stack and the credential
//! store are external subsystems. The core only depends on these traits;
//! production code plugs in real implementations while tests use the mocks
//! from [`crate::mock`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::TransportConfig;
use crate::error::Result;
use crate::event::{InboundMessage, TransportEvent};

/// Delivery guarantee for a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

/// Radio operating mode as reported by the association stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiMode {
    Sta,
    Ap,
    ApSta,
    #[default]
    Unknown,
}

impl WifiMode {
    /// Wire rendering used in status reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sta => "STA",
            Self::Ap => "AP",
            Self::ApSta => "AP+STA",
            Self::Unknown => "-",
        }
    }
}

impl std::fmt::Display for WifiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the current association, as reported by [`NetworkControl`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStatus {
    /// Whether the device is associated with an access point.
    pub connected: bool,
    /// SSID of the current association, if any.
    pub ssid: Option<String>,
    /// Current station IP address, if any.
    pub ip: Option<String>,
    /// Signal strength in dBm; `0` when unknown.
    pub rssi: i32,
    /// Current radio mode.
    pub mode: WifiMode,
}

/// One saved network credential entry, owned by the [`CredentialStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNetwork {
    pub ssid: String,
    #[serde(default)]
    pub priority: u32,
}

impl SavedNetwork {
    pub fn new(ssid: impl Into<String>, priority: u32) -> Self {
        Self {
            ssid: ssid.into(),
            priority,
        }
    }
}

/// Pub/sub transport collaborator.
///
/// Offers synchronous-looking calls plus two asynchronous channels: session
/// lifecycle events and inbound messages. `start()` issues exactly one
/// connection attempt; the outcome arrives as a [`TransportEvent`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Apply the session configuration. Called once during manager
    /// initialization; errors propagate to the caller unchanged.
    async fn configure(&self, config: &TransportConfig) -> Result<()>;

    /// Issue one connection attempt. Must not block until the session is
    /// established.
    async fn start(&self) -> Result<()>;

    /// Publish a message on the established session.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()>;

    /// Subscribe a topic filter on the established session.
    async fn subscribe(&self, topic: &str) -> Result<()>;

    /// Session lifecycle event stream.
    fn events(&self) -> broadcast::Receiver<TransportEvent>;

    /// Inbound message stream.
    fn messages(&self) -> broadcast::Receiver<InboundMessage>;
}

/// Radio/association stack collaborator.
#[async_trait]
pub trait NetworkControl: Send + Sync {
    /// Submit a connect request for the given credentials. Returns once the
    /// request is accepted, not once the association completes.
    async fn connect(&self, ssid: &str, password: Option<&str>) -> Result<()>;

    /// Request a disconnect; the external connectivity state machine picks
    /// the next network by priority order.
    async fn disconnect(&self) -> Result<()>;

    /// Snapshot of the current association.
    async fn link_status(&self) -> LinkStatus;
}

/// Credential persistence collaborator.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the saved network list, best first.
    async fn load_all(&self) -> Result<Vec<SavedNetwork>>;

    /// Raise the entry's priority so the connectivity state machine prefers
    /// it on the next reconnect.
    async fn promote(&self, entry: &SavedNetwork) -> Result<()>;
}
