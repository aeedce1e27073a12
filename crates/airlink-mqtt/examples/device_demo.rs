//! Walks the connection manager through a connect / command / reconnect
//! cycle against in-memory collaborators.
//!
//! Run with: `cargo run --example device_demo`

use std::sync::Arc;
use std::time::Duration;

use airlink_core::mock::{MockCredentialStore, MockNetworkControl, MockTransport};
use airlink_core::{LinkStatus, ManagerConfig, SavedNetwork, TransportEvent, WifiMode};
use airlink_mqtt::commands::wifi;
use airlink_mqtt::{ConnectionManager, WifiCommands};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let transport = Arc::new(MockTransport::new());
    let network = Arc::new(MockNetworkControl::new());
    network.set_status(LinkStatus {
        connected: true,
        ssid: Some("lab".to_string()),
        ip: Some("192.168.4.2".to_string()),
        rssi: -48,
        mode: WifiMode::Sta,
    });
    let store = Arc::new(MockCredentialStore::with_networks(vec![
        SavedNetwork::new("lab", 2),
        SavedNetwork::new("home", 1),
    ]));

    let config = ManagerConfig::new("192.168.1.10")
        .with_client_id("demo-device")
        .with_reconnect_interval(500)
        .with_step_interval(100)
        .with_state_callback(Arc::new(|state| println!("MQTT state: {state}")));

    let manager = ConnectionManager::new(config, transport.clone());
    let commands = WifiCommands::new(
        transport.clone(),
        network.clone(),
        store.clone(),
        manager.link_config(),
    );
    manager.register_module(wifi::MODULE_PREFIX, Arc::new(commands))?;
    manager.start().await?;

    // The broker accepts the session; command filters get subscribed.
    transport.emit_event(TransportEvent::Connected);
    sleep(Duration::from_millis(50)).await;

    // The web side asks for status and the saved list.
    transport.emit_message("xn/web/wifi/demo-device/get_status", b"".to_vec());
    transport.emit_message("xn/web/wifi/demo-device/get_saved", b"".to_vec());
    sleep(Duration::from_millis(50)).await;

    for report in transport.published() {
        println!("{} -> {}", report.topic, String::from_utf8_lossy(&report.payload));
    }

    // The link drops; the manager retries once the gate opens.
    transport.emit_event(TransportEvent::Disconnected);
    sleep(Duration::from_millis(1_200)).await;
    println!("connect attempts so far: {}", transport.start_count());

    Ok(())
}
