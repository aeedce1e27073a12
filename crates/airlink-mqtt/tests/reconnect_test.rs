//! Reconnect gate timing properties of the connection manager.
//!
//! All tests run on paused Tokio time, so the step loop advances
//! deterministically and the assertions are exact up to one step interval.

use std::sync::Arc;
use std::time::Duration;

use airlink_core::mock::MockTransport;
use airlink_core::{ConnectionState, LinkError, LinkEvent, ManagerConfig, TransportEvent};
use airlink_mqtt::ConnectionManager;
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};

fn manager_with(
    reconnect_ms: i64,
    step_ms: u64,
    transport: Arc<MockTransport>,
) -> ConnectionManager {
    let config = ManagerConfig::new("broker.local")
        .with_client_id("device-1")
        .with_reconnect_interval(reconnect_ms)
        .with_step_interval(step_ms);
    ConnectionManager::new(config, transport)
}

/// Let the spawned manager tasks run and subscribe their channels.
async fn settle() {
    sleep(Duration::from_millis(5)).await;
}

#[tokio::test(start_paused = true)]
async fn initial_attempt_is_direct_and_ungated() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(60_000, 100, transport.clone());

    manager.start().await.unwrap();
    assert_eq!(transport.start_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // Without a recorded failure the gate stays closed: no periodic
    // attempts no matter how long we wait.
    sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.start_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failure_gates_reconnect_until_interval_elapses() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(5_000, 100, transport.clone());

    manager.start().await.unwrap();
    settle().await;

    let failed_at = Instant::now();
    transport.emit_event(TransportEvent::Disconnected);
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // Well before the interval: no attempt beyond the initial direct one.
    sleep(Duration::from_millis(4_000)).await;
    assert_eq!(transport.start_count(), 1);

    // Past the interval (plus step granularity): exactly one gated attempt.
    sleep(Duration::from_millis(1_200)).await;
    assert_eq!(transport.start_count(), 2);
    assert_eq!(manager.state(), ConnectionState::Connecting);

    let attempts = transport.start_times();
    assert!(attempts[1].duration_since(failed_at) >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn zero_interval_retries_on_the_next_tick() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(0, 100, transport.clone());

    manager.start().await.unwrap();
    settle().await;
    // Interval zero means the very first tick already attempts; the gate
    // then stamps the attempt so it does not fire again while Connecting.
    assert_eq!(transport.start_count(), 2);

    transport.emit_event(TransportEvent::Disconnected);
    settle().await;
    sleep(Duration::from_millis(250)).await;
    // One more attempt on the next tick after the failure.
    assert_eq!(transport.start_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn negative_interval_disables_automatic_retry() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(-1, 100, transport.clone());

    manager.start().await.unwrap();
    settle().await;

    transport.emit_event(TransportEvent::Error);
    settle().await;
    assert_eq!(manager.state(), ConnectionState::Error);

    sleep(Duration::from_secs(3_600)).await;
    assert_eq!(transport.start_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Error);
}

#[tokio::test(start_paused = true)]
async fn error_event_waits_the_full_interval() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(1_000, 100, transport.clone());

    manager.start().await.unwrap();
    settle().await;

    let failed_at = Instant::now();
    transport.emit_event(TransportEvent::Error);
    settle().await;

    sleep(Duration::from_millis(1_200)).await;
    assert_eq!(transport.start_count(), 2);
    let attempts = transport.start_times();
    assert!(attempts[1].duration_since(failed_at) >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn connected_clears_the_failure_clock() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(5_000, 100, transport.clone());

    manager.start().await.unwrap();
    settle().await;

    transport.emit_event(TransportEvent::Connected);
    settle().await;
    // No modules registered: subscription is trivially complete and the
    // link advances to ready.
    assert_eq!(manager.state(), ConnectionState::Ready);

    // An established session never triggers periodic attempts.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.start_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn start_twice_does_not_duplicate_the_step_task() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(1_000, 100, transport.clone());

    manager.start().await.unwrap();
    manager.start().await.unwrap();
    // Two direct attempts, one per start call.
    assert_eq!(transport.start_count(), 2);

    transport.emit_event(TransportEvent::Disconnected);
    settle().await;
    sleep(Duration::from_millis(1_200)).await;
    // A duplicated step loop would fire twice per gate opening.
    assert_eq!(transport.start_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn state_callback_sees_every_transition() {
    let transport = Arc::new(MockTransport::new());
    let seen: Arc<Mutex<Vec<ConnectionState>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let config = ManagerConfig::new("broker.local")
        .with_client_id("device-1")
        .with_reconnect_interval(1_000)
        .with_step_interval(100)
        .with_state_callback(Arc::new(move |state| sink.lock().push(state)));
    let manager = ConnectionManager::new(config, transport.clone());
    let mut events = manager.subscribe();

    manager.start().await.unwrap();
    settle().await;
    transport.emit_event(TransportEvent::Disconnected);
    settle().await;
    sleep(Duration::from_millis(1_200)).await;

    let states = seen.lock().clone();
    assert_eq!(states.first(), Some(&ConnectionState::Disconnected));
    assert!(states.contains(&ConnectionState::Connecting));

    // The observability stream sees the same transitions.
    let LinkEvent::StateChanged { new, .. } = events.recv().await.unwrap();
    assert_eq!(new, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn connected_resubscribes_registered_module_filters() {
    let transport = Arc::new(MockTransport::new());
    let manager = manager_with(5_000, 100, transport.clone());
    manager
        .register_module("wifi", Arc::new(NoopModule))
        .unwrap();

    manager.start().await.unwrap();
    settle().await;
    transport.emit_event(TransportEvent::Connected);
    settle().await;

    assert_eq!(manager.state(), ConnectionState::Ready);
    assert_eq!(transport.subscriptions(), vec!["xn/web/wifi/device-1/+"]);
}

#[tokio::test]
async fn start_rejects_missing_broker() {
    let transport = Arc::new(MockTransport::new());
    let manager = ConnectionManager::new(ManagerConfig::new("  "), transport);
    assert!(matches!(
        manager.start().await,
        Err(LinkError::Config(_))
    ));
}

#[tokio::test]
async fn transport_configure_errors_propagate_unchanged() {
    let transport = Arc::new(MockTransport::new());
    transport.fail_configure("tls handshake refused");
    let manager = manager_with(1_000, 100, transport);
    match manager.start().await {
        Err(LinkError::Transport(message)) => assert_eq!(message, "tls handshake refused"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

struct NoopModule;

#[async_trait::async_trait]
impl airlink_mqtt::CommandModule for NoopModule {
    async fn handle(&self, _command: &str, _payload: &[u8]) {}
}
