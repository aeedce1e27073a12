//! Airlink MQTT crate.
//!
//! Keeps a pub/sub session alive over an unreliable wireless link and
//! exposes a small remote-command protocol on top of it.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `rumqttc` | ✅ | `rumqttc`-backed transport collaborator |
//!
//! ## Architecture
//!
//! - [`ConnectionManager`]: the link state machine and reconnect policy.
//!   It consumes transport events, drives time-gated reconnect attempts
//!   from a polling task, and reports state changes to the application.
//! - [`CommandRouter`]: matches inbound `<base>/<module>/<device_id>/<command>`
//!   topics and dispatches to registered [`CommandModule`]s.
//! - [`WifiCommands`]: the network-configuration command module
//!   (`set`, `get_status`, `get_saved`, `connect_saved`).
//!
//! The manager never interprets business topics and the command modules
//! never track session state; the two meet only at the router.
//!
//! ```ignore
//! let transport = Arc::new(MqttTransport::new());
//! let manager = ConnectionManager::new(config, transport.clone());
//! let wifi = WifiCommands::new(transport, network, store, manager.link_config());
//! manager.register_module(wifi::MODULE_PREFIX, Arc::new(wifi))?;
//! manager.start().await?;
//! ```

pub mod commands;
pub mod json;
pub mod manager;
pub mod router;
pub mod transport;

pub use commands::wifi::WifiCommands;
pub use manager::{ConnectionManager, LinkConfig};
pub use router::{CommandModule, CommandRouter, ParsedTopic, MAX_MODULES};
