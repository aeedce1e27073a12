//! Remote wifi provisioning and status commands.
//!
//! Handles the downlink commands
//! `<base>/wifi/<device_id>/{set,get_status,get_saved,connect_saved}` and
//! reports on `<uplink>/wifi/<device_id>/{status,saved}`. The module only
//! parses commands, calls the network/storage collaborators and publishes
//! reports; connectivity state lives elsewhere.
//!
//! Malformed payloads are logged and dropped. There is no downlink error
//! acknowledgement channel: command outcomes are observable only through
//! the defined uplink reports.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use airlink_core::{CredentialStore, NetworkControl, QoS, Transport};

use crate::json::JsonObject;
use crate::manager::LinkConfig;
use crate::router::CommandModule;

/// Module prefix this handler registers under.
pub const MODULE_PREFIX: &str = "wifi";

/// Saved networks considered per request.
pub const SAVED_NETWORK_CAP: usize = 5;

/// Working-buffer limits for inbound payloads. Anything beyond the limit
/// is truncated before parsing, not rejected.
const SET_PAYLOAD_CAP: usize = 256;
const CONNECT_SAVED_PAYLOAD_CAP: usize = 128;

/// Longest uplink topic we will publish to.
const MAX_TOPIC_LEN: usize = 128;

const STATUS_JSON_CAP: usize = 256;
const SAVED_JSON_CAP: usize = 512;
const SAVED_ENTRY_JSON_CAP: usize = 64;

/// Network-configuration command module.
pub struct WifiCommands {
    transport: Arc<dyn Transport>,
    network: Arc<dyn NetworkControl>,
    store: Arc<dyn CredentialStore>,
    link: Arc<LinkConfig>,
}

/// Key lines recognized in command payloads.
#[derive(Debug, Default, PartialEq, Eq)]
struct WifiPayload<'a> {
    ssid: Option<&'a str>,
    password: Option<&'a str>,
}

/// Parse newline-separated `key=value` lines. Trailing `\r` and spaces are
/// stripped per line; the last occurrence of a key wins.
fn parse_payload(text: &str) -> WifiPayload<'_> {
    let mut parsed = WifiPayload::default();
    for line in text.split('\n') {
        let line = line.trim_end_matches(|c| c == '\r' || c == ' ');
        if let Some(value) = line.strip_prefix("ssid=") {
            parsed.ssid = Some(value);
        } else if let Some(value) = line.strip_prefix("password=") {
            parsed.password = Some(value);
        }
    }
    parsed
}

/// Truncate to the working buffer and decode leniently.
fn payload_text(payload: &[u8], cap: usize) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(&payload[..payload.len().min(cap)])
}

impl WifiCommands {
    pub fn new(
        transport: Arc<dyn Transport>,
        network: Arc<dyn NetworkControl>,
        store: Arc<dyn CredentialStore>,
        link: Arc<LinkConfig>,
    ) -> Self {
        Self {
            transport,
            network,
            store,
            link,
        }
    }

    /// `set`: submit new credentials to the association stack.
    async fn handle_set(&self, payload: &[u8]) {
        if payload.is_empty() {
            return;
        }
        let text = payload_text(payload, SET_PAYLOAD_CAP);
        let parsed = parse_payload(&text);
        let Some(ssid) = parsed.ssid.filter(|s| !s.is_empty()) else {
            warn!("wifi set: missing ssid");
            return;
        };
        let password = parsed.password.filter(|p| !p.is_empty());

        match self.network.connect(ssid, password).await {
            Ok(()) => info!(ssid, "wifi set: connect submitted"),
            Err(err) => warn!(error = %err, "wifi set: connect submit failed"),
        }
    }

    /// `get_status`: report the current association.
    async fn handle_get_status(&self) {
        let status = self.network.link_status().await;

        let mut json = JsonObject::with_capacity(STATUS_JSON_CAP);
        json.bool_field("connected", status.connected)
            .str_field("ssid", status.ssid.as_deref().unwrap_or("-"))
            .str_field("ip", status.ip.as_deref().unwrap_or("-"))
            .int_field("rssi", i64::from(status.rssi))
            .str_field("mode", status.mode.as_str());

        self.publish_report("status", json.finish()).await;
    }

    /// `get_saved`: report the saved network list, capped.
    async fn handle_get_saved(&self) {
        let networks = match self.store.load_all().await {
            Ok(networks) => networks,
            Err(err) => {
                warn!(error = %err, "wifi get_saved: load failed");
                Vec::new()
            }
        };

        let items = networks
            .iter()
            .take(SAVED_NETWORK_CAP)
            .filter(|entry| !entry.ssid.is_empty())
            .filter_map(|entry| {
                let mut item = JsonObject::with_capacity(SAVED_ENTRY_JSON_CAP);
                item.str_field("ssid", &entry.ssid);
                if item.is_truncated() {
                    warn!(ssid = %entry.ssid, "wifi get_saved: entry too long, skipped");
                    None
                } else {
                    Some(item.finish())
                }
            })
            .collect::<Vec<_>>();

        let mut json = JsonObject::with_capacity(SAVED_JSON_CAP);
        json.list_field("list", items);

        self.publish_report("saved", json.finish()).await;
    }

    /// `connect_saved`: promote a stored network and request a disconnect
    /// so the connectivity state machine reconnects by priority order.
    async fn handle_connect_saved(&self, payload: &[u8]) {
        if payload.is_empty() {
            return;
        }
        let text = payload_text(payload, CONNECT_SAVED_PAYLOAD_CAP);
        let parsed = parse_payload(&text);
        let Some(ssid) = parsed.ssid.filter(|s| !s.is_empty()) else {
            warn!("wifi connect_saved: missing ssid");
            return;
        };

        let networks = match self.store.load_all().await {
            Ok(networks) => networks,
            Err(err) => {
                warn!(error = %err, "wifi connect_saved: load failed");
                return;
            }
        };
        let Some(entry) = networks
            .iter()
            .take(SAVED_NETWORK_CAP)
            .find(|entry| !entry.ssid.is_empty() && entry.ssid == ssid)
        else {
            warn!(ssid, "wifi connect_saved: ssid not in saved list");
            return;
        };

        if let Err(err) = self.store.promote(entry).await {
            warn!(error = %err, "wifi connect_saved: priority promotion failed");
            return;
        }
        if let Err(err) = self.network.disconnect().await {
            warn!(error = %err, "wifi connect_saved: disconnect request failed");
            return;
        }
        info!(ssid, "wifi connect_saved: reconnect requested");
    }

    /// Publish a report under `<uplink>/wifi/<device_id>/<leaf>`.
    async fn publish_report(&self, leaf: &str, body: String) {
        if self.link.client_id.is_empty() {
            return;
        }
        let topic = format!(
            "{}/{}/{}/{}",
            self.link.uplink_base_topic, MODULE_PREFIX, self.link.client_id, leaf
        );
        if topic.len() > MAX_TOPIC_LEN {
            warn!(%topic, "uplink topic too long, dropping report");
            return;
        }
        if let Err(err) = self
            .transport
            .publish(&topic, body.as_bytes(), QoS::AtLeastOnce, false)
            .await
        {
            warn!(error = %err, %topic, "report publish failed");
        }
    }
}

#[async_trait]
impl CommandModule for WifiCommands {
    async fn handle(&self, command: &str, payload: &[u8]) {
        match command {
            "set" => self.handle_set(payload).await,
            "get_status" => self.handle_get_status().await,
            "get_saved" => self.handle_get_saved().await,
            "connect_saved" => self.handle_connect_saved(payload).await,
            other => debug!(command = other, "unknown wifi command"),
        }
    }
}
