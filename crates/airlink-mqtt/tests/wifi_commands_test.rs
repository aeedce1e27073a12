//! End-to-end behavior of the wifi command module against mock
//! collaborators, including the exact report schemas.

use std::sync::Arc;

use airlink_core::mock::{MockCredentialStore, MockNetworkControl, MockTransport};
use airlink_core::{LinkStatus, QoS, SavedNetwork, WifiMode};
use airlink_mqtt::commands::wifi;
use airlink_mqtt::{CommandModule, LinkConfig, WifiCommands};
use serde_json::{json, Value};

struct Fixture {
    transport: Arc<MockTransport>,
    network: Arc<MockNetworkControl>,
    store: Arc<MockCredentialStore>,
    wifi: WifiCommands,
}

fn fixture() -> Fixture {
    let transport = Arc::new(MockTransport::new());
    let network = Arc::new(MockNetworkControl::new());
    let store = Arc::new(MockCredentialStore::new());
    let link = Arc::new(LinkConfig {
        base_topic: "xn/web".to_string(),
        uplink_base_topic: "xn/esp".to_string(),
        client_id: "device-1".to_string(),
    });
    let wifi = WifiCommands::new(
        transport.clone(),
        network.clone(),
        store.clone(),
        link,
    );
    Fixture {
        transport,
        network,
        store,
        wifi,
    }
}

fn parse_report(fixture: &Fixture, expected_topic: &str) -> Value {
    let published = fixture.transport.published();
    assert_eq!(published.len(), 1, "expected exactly one report");
    let report = &published[0];
    assert_eq!(report.topic, expected_topic);
    assert_eq!(report.qos, QoS::AtLeastOnce);
    assert!(!report.retain);
    serde_json::from_slice(&report.payload).expect("report is valid JSON")
}

#[tokio::test]
async fn set_submits_one_connect_call() {
    let fx = fixture();
    fx.wifi.handle("set", b"ssid=Home\npassword=secret").await;

    assert_eq!(
        fx.network.connect_calls(),
        vec![("Home".to_string(), Some("secret".to_string()))]
    );
    assert!(fx.transport.published().is_empty());
}

#[tokio::test]
async fn set_without_password_connects_open_network() {
    let fx = fixture();
    fx.wifi.handle("set", b"ssid=OpenNet").await;

    assert_eq!(
        fx.network.connect_calls(),
        vec![("OpenNet".to_string(), None)]
    );
}

#[tokio::test]
async fn set_treats_empty_password_as_absent() {
    let fx = fixture();
    fx.wifi.handle("set", b"ssid=Home\npassword=").await;

    assert_eq!(fx.network.connect_calls(), vec![("Home".to_string(), None)]);
}

#[tokio::test]
async fn set_strips_crlf_and_trailing_spaces() {
    let fx = fixture();
    fx.wifi
        .handle("set", b"ssid=Home  \r\npassword=secret \r")
        .await;

    assert_eq!(
        fx.network.connect_calls(),
        vec![("Home".to_string(), Some("secret".to_string()))]
    );
}

#[tokio::test]
async fn set_without_ssid_has_no_side_effects() {
    let fx = fixture();
    fx.wifi.handle("set", b"password=secret").await;
    fx.wifi.handle("set", b"ssid=").await;
    fx.wifi.handle("set", b"").await;

    assert!(fx.network.connect_calls().is_empty());
    assert!(fx.transport.published().is_empty());
}

#[tokio::test]
async fn get_status_reports_placeholders_when_offline() {
    let fx = fixture();
    fx.wifi.handle("get_status", b"").await;

    let report = parse_report(&fx, "xn/esp/wifi/device-1/status");
    assert_eq!(
        report,
        json!({"connected": false, "ssid": "-", "ip": "-", "rssi": 0, "mode": "-"})
    );
}

#[tokio::test]
async fn get_status_reports_the_current_association() {
    let fx = fixture();
    fx.network.set_status(LinkStatus {
        connected: true,
        ssid: Some("Lab".to_string()),
        ip: Some("192.168.4.2".to_string()),
        rssi: -42,
        mode: WifiMode::Sta,
    });
    fx.wifi.handle("get_status", b"ignored").await;

    let report = parse_report(&fx, "xn/esp/wifi/device-1/status");
    assert_eq!(
        report,
        json!({
            "connected": true,
            "ssid": "Lab",
            "ip": "192.168.4.2",
            "rssi": -42,
            "mode": "STA"
        })
    );
}

#[tokio::test]
async fn get_saved_caps_the_list() {
    let fx = fixture();
    fx.store.set_networks(
        (0..7)
            .map(|i| SavedNetwork::new(format!("net-{i}"), i as u32))
            .collect(),
    );
    fx.wifi.handle("get_saved", b"").await;

    let report = parse_report(&fx, "xn/esp/wifi/device-1/saved");
    let list = report["list"].as_array().unwrap();
    assert_eq!(list.len(), wifi::SAVED_NETWORK_CAP);
    for (i, entry) in list.iter().enumerate() {
        assert_eq!(entry["ssid"], format!("net-{i}"));
    }
}

#[tokio::test]
async fn get_saved_renders_empty_list() {
    let fx = fixture();
    fx.wifi.handle("get_saved", b"").await;

    let report = parse_report(&fx, "xn/esp/wifi/device-1/saved");
    assert_eq!(report, json!({"list": []}));
}

#[tokio::test]
async fn get_saved_reports_empty_on_load_failure() {
    let fx = fixture();
    fx.store.fail_load("flash read failed");
    fx.wifi.handle("get_saved", b"").await;

    let report = parse_report(&fx, "xn/esp/wifi/device-1/saved");
    assert_eq!(report, json!({"list": []}));
}

#[tokio::test]
async fn get_saved_escapes_awkward_ssids() {
    let fx = fixture();
    let ssid = "Quote\"Net\\";
    fx.store
        .set_networks(vec![SavedNetwork::new(ssid, 1)]);
    fx.wifi.handle("get_saved", b"").await;

    let report = parse_report(&fx, "xn/esp/wifi/device-1/saved");
    assert_eq!(report["list"][0]["ssid"], ssid);
}

#[tokio::test]
async fn connect_saved_promotes_and_requests_disconnect() {
    let fx = fixture();
    fx.store.set_networks(vec![
        SavedNetwork::new("home", 3),
        SavedNetwork::new("lab", 1),
    ]);
    fx.wifi.handle("connect_saved", b"ssid=lab").await;

    assert_eq!(fx.store.promoted(), vec![SavedNetwork::new("lab", 1)]);
    assert_eq!(fx.network.disconnect_count(), 1);
}

#[tokio::test]
async fn connect_saved_misses_do_nothing() {
    let fx = fixture();
    fx.store.set_networks(vec![SavedNetwork::new("home", 1)]);
    fx.wifi.handle("connect_saved", b"ssid=unknown").await;

    assert!(fx.store.promoted().is_empty());
    assert_eq!(fx.network.disconnect_count(), 0);
}

#[tokio::test]
async fn connect_saved_requires_exact_ssid_match() {
    let fx = fixture();
    fx.store.set_networks(vec![SavedNetwork::new("home", 1)]);
    fx.wifi.handle("connect_saved", b"ssid=hom").await;
    fx.wifi.handle("connect_saved", b"ssid=HOME").await;

    assert!(fx.store.promoted().is_empty());
    assert_eq!(fx.network.disconnect_count(), 0);
}

#[tokio::test]
async fn connect_saved_without_ssid_has_no_side_effects() {
    let fx = fixture();
    fx.store.set_networks(vec![SavedNetwork::new("home", 1)]);
    fx.wifi.handle("connect_saved", b"").await;
    fx.wifi.handle("connect_saved", b"password=x").await;

    assert!(fx.store.promoted().is_empty());
    assert_eq!(fx.network.disconnect_count(), 0);
}

#[tokio::test]
async fn unknown_commands_are_dropped() {
    let fx = fixture();
    fx.wifi.handle("reboot", b"").await;
    fx.wifi.handle("set/extra", b"ssid=Home").await;

    assert!(fx.network.connect_calls().is_empty());
    assert!(fx.transport.published().is_empty());
}
