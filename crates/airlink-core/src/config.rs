//! Configuration for the connection manager and the transport collaborator.
//!
//! Structures follow the usual builder-plus-serde pattern: every field has
//! a default so partial JSON configs deserialize cleanly, and `with_*`
//! methods cover programmatic construction.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::ConnectionState;

/// Default downlink (command) base topic.
pub const DEFAULT_BASE_TOPIC: &str = "xn/web";
/// Default uplink (report) base topic.
pub const DEFAULT_UPLINK_BASE_TOPIC: &str = "xn/esp";
/// Default MQTT broker port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;
/// Default transport keepalive in seconds.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 60;
/// Default period of the manager's polling loop in milliseconds.
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 1_000;
/// Default wait between reconnect attempts in milliseconds.
pub const DEFAULT_RECONNECT_INTERVAL_MS: i64 = 5_000;

/// Callback invoked on every link state transition.
pub type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Configuration for a [`crate::traits::Transport`] collaborator, derived
/// from the manager configuration at initialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Broker host name or address.
    pub broker: String,
    /// Broker port.
    pub port: u16,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Username for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Keepalive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
    /// Clean session flag.
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,
}

/// Configuration for the connection manager.
///
/// The manager copies the configuration at construction; the caller's value
/// may be dropped or mutated afterwards without affecting the manager.
#[derive(Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Broker host name or address. Required and non-empty.
    pub broker: String,

    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client identifier; doubles as the device id in command topics.
    /// Auto-generated when not provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Username for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Keepalive in seconds; `0` keeps the default.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// Base topic for downlink commands.
    #[serde(default = "default_base_topic")]
    pub base_topic: String,

    /// Base topic for uplink reports.
    #[serde(default = "default_uplink_base_topic")]
    pub uplink_base_topic: String,

    /// Wait between reconnect attempts in milliseconds. Negative disables
    /// automatic retry; `0` retries on every step tick.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: i64,

    /// Period of the polling loop in milliseconds; `0` keeps the default.
    #[serde(default = "default_step_interval")]
    pub step_interval_ms: u64,

    /// Callback invoked on every state transition.
    #[serde(skip)]
    pub on_state_change: Option<StateCallback>,
}

fn default_port() -> u16 {
    DEFAULT_BROKER_PORT
}

fn default_keepalive() -> u64 {
    DEFAULT_KEEPALIVE_SECS
}

fn default_clean_session() -> bool {
    true
}

fn default_base_topic() -> String {
    DEFAULT_BASE_TOPIC.to_string()
}

fn default_uplink_base_topic() -> String {
    DEFAULT_UPLINK_BASE_TOPIC.to_string()
}

fn default_reconnect_interval() -> i64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

fn default_step_interval() -> u64 {
    DEFAULT_STEP_INTERVAL_MS
}

impl ManagerConfig {
    /// Create a configuration for the given broker host.
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            port: DEFAULT_BROKER_PORT,
            client_id: None,
            username: None,
            password: None,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
            base_topic: DEFAULT_BASE_TOPIC.to_string(),
            uplink_base_topic: DEFAULT_UPLINK_BASE_TOPIC.to_string(),
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
            on_state_change: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_keepalive(mut self, keepalive_secs: u64) -> Self {
        self.keepalive_secs = keepalive_secs;
        self
    }

    pub fn with_base_topic(mut self, base_topic: impl Into<String>) -> Self {
        self.base_topic = base_topic.into();
        self
    }

    pub fn with_uplink_base_topic(mut self, uplink_base_topic: impl Into<String>) -> Self {
        self.uplink_base_topic = uplink_base_topic.into();
        self
    }

    pub fn with_reconnect_interval(mut self, interval_ms: i64) -> Self {
        self.reconnect_interval_ms = interval_ms;
        self
    }

    pub fn with_step_interval(mut self, interval_ms: u64) -> Self {
        self.step_interval_ms = interval_ms;
        self
    }

    pub fn with_state_callback(mut self, callback: StateCallback) -> Self {
        self.on_state_change = Some(callback);
        self
    }

    /// The client id to present to the broker; generated when absent.
    pub fn resolved_client_id(&self) -> String {
        match &self.client_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("airlink-{}", Uuid::new_v4()),
        }
    }

    /// Build the transport collaborator configuration. A keepalive of `0`
    /// keeps the transport default.
    pub fn transport_config(&self, client_id: &str) -> TransportConfig {
        TransportConfig {
            broker: self.broker.clone(),
            port: self.port,
            client_id: client_id.to_string(),
            username: self.username.clone(),
            password: self.password.clone(),
            keepalive_secs: if self.keepalive_secs > 0 {
                self.keepalive_secs
            } else {
                DEFAULT_KEEPALIVE_SECS
            },
            clean_session: true,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("broker", &self.broker)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("keepalive_secs", &self.keepalive_secs)
            .field("base_topic", &self.base_topic)
            .field("uplink_base_topic", &self.uplink_base_topic)
            .field("reconnect_interval_ms", &self.reconnect_interval_ms)
            .field("step_interval_ms", &self.step_interval_ms)
            .field(
                "on_state_change",
                &self.on_state_change.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}
