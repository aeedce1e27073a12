//! In-memory mock collaborators for tests and examples.
//!
//! The mocks record every call and let tests script the answers. They are
//! compiled into the crate (not behind `cfg(test)`) so downstream crates
//! and examples can use them too.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use crate::config::TransportConfig;
use crate::error::{LinkError, Result};
use crate::event::{InboundMessage, TransportEvent};
use crate::traits::{CredentialStore, LinkStatus, NetworkControl, QoS, SavedNetwork, Transport};

const CHANNEL_CAPACITY: usize = 256;

/// One message recorded by [`MockTransport::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Scriptable in-memory transport.
pub struct MockTransport {
    event_tx: broadcast::Sender<TransportEvent>,
    message_tx: broadcast::Sender<InboundMessage>,
    configured: Mutex<Option<TransportConfig>>,
    configure_error: Mutex<Option<String>>,
    start_times: Mutex<Vec<Instant>>,
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (message_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            event_tx,
            message_tx,
            configured: Mutex::new(None),
            configure_error: Mutex::new(None),
            start_times: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `configure` call fail with a transport error.
    pub fn fail_configure(&self, message: impl Into<String>) {
        *self.configure_error.lock() = Some(message.into());
    }

    /// Deliver a session lifecycle event to all listeners.
    pub fn emit_event(&self, event: TransportEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Deliver an inbound message to all listeners.
    pub fn emit_message(&self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        let _ = self.message_tx.send(InboundMessage::new(topic, payload));
    }

    /// Configuration applied by the last `configure` call.
    pub fn configured(&self) -> Option<TransportConfig> {
        self.configured.lock().clone()
    }

    /// Number of connect attempts issued so far.
    pub fn start_count(&self) -> usize {
        self.start_times.lock().len()
    }

    /// Instants at which connect attempts were issued.
    pub fn start_times(&self) -> Vec<Instant> {
        self.start_times.lock().clone()
    }

    /// Everything published so far.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    /// Topic filters subscribed so far.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn configure(&self, config: &TransportConfig) -> Result<()> {
        if let Some(message) = self.configure_error.lock().take() {
            return Err(LinkError::Transport(message));
        }
        *self.configured.lock() = Some(config.clone());
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.start_times.lock().push(Instant::now());
        debug!("mock transport: connect attempt issued");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()> {
        self.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        self.subscriptions.lock().push(topic.to_string());
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.event_tx.subscribe()
    }

    fn messages(&self) -> broadcast::Receiver<InboundMessage> {
        self.message_tx.subscribe()
    }
}

/// Scriptable radio/association stack.
pub struct MockNetworkControl {
    status: Mutex<LinkStatus>,
    connects: Mutex<Vec<(String, Option<String>)>>,
    disconnects: AtomicUsize,
}

impl MockNetworkControl {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(LinkStatus::default()),
            connects: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        }
    }

    /// Script the answer for `link_status`.
    pub fn set_status(&self, status: LinkStatus) {
        *self.status.lock() = status;
    }

    /// Connect requests recorded so far, as `(ssid, password)`.
    pub fn connect_calls(&self) -> Vec<(String, Option<String>)> {
        self.connects.lock().clone()
    }

    /// Disconnect requests recorded so far.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl Default for MockNetworkControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkControl for MockNetworkControl {
    async fn connect(&self, ssid: &str, password: Option<&str>) -> Result<()> {
        self.connects
            .lock()
            .push((ssid.to_string(), password.map(str::to_string)));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn link_status(&self) -> LinkStatus {
        self.status.lock().clone()
    }
}

/// Scriptable credential store.
pub struct MockCredentialStore {
    networks: Mutex<Vec<SavedNetwork>>,
    promoted: Mutex<Vec<SavedNetwork>>,
    load_error: Mutex<Option<String>>,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Vec::new()),
            promoted: Mutex::new(Vec::new()),
            load_error: Mutex::new(None),
        }
    }

    pub fn with_networks(networks: Vec<SavedNetwork>) -> Self {
        let store = Self::new();
        *store.networks.lock() = networks;
        store
    }

    pub fn set_networks(&self, networks: Vec<SavedNetwork>) {
        *self.networks.lock() = networks;
    }

    /// Make the next `load_all` call fail.
    pub fn fail_load(&self, message: impl Into<String>) {
        *self.load_error.lock() = Some(message.into());
    }

    /// Entries promoted so far, in order.
    pub fn promoted(&self) -> Vec<SavedNetwork> {
        self.promoted.lock().clone()
    }
}

impl Default for MockCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load_all(&self) -> Result<Vec<SavedNetwork>> {
        if let Some(message) = self.load_error.lock().take() {
            return Err(LinkError::NotFound(message));
        }
        Ok(self.networks.lock().clone())
    }

    async fn promote(&self, entry: &SavedNetwork) -> Result<()> {
        self.promoted.lock().push(entry.clone());
        Ok(())
    }
}
