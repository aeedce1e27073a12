//! MQTT session lifecycle management.
//!
//! The connection manager owns the link state machine and the reconnect
//! policy. It does not interpret business topics; inbound messages are
//! handed to the [`CommandRouter`] unseen.
//!
//! Recovery is driven by a polling task: once per step interval the
//! manager checks whether the reconnect gate is open and, if so, issues a
//! single connect attempt through the transport. The gate measures time
//! since the last *failure event*, not since the last attempt, so an error
//! burst does not keep resetting the clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use airlink_core::config::DEFAULT_STEP_INTERVAL_MS;
use airlink_core::{
    ConnectionState, LinkError, LinkEvent, ManagerConfig, Result, Transport, TransportEvent,
};

use crate::router::{CommandModule, CommandRouter};

/// Buffered state-change events kept for slow subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Resolved, immutable view of the manager configuration that the router
/// and the command modules read at dispatch/publish time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Base topic for downlink commands.
    pub base_topic: String,
    /// Base topic for uplink reports.
    pub uplink_base_topic: String,
    /// Client identifier; doubles as the device id in topics.
    pub client_id: String,
}

/// Mutable cell shared between the polling task and the event task. All
/// writes to the state machine go through this lock.
struct Gate {
    state: ConnectionState,
    last_failure: Option<Instant>,
}

/// How a transition updates the failure timestamp.
enum Stamp {
    Keep,
    Clear,
    At(Instant),
}

struct Shared {
    config: ManagerConfig,
    link: Arc<LinkConfig>,
    transport: Arc<dyn Transport>,
    router: Arc<CommandRouter>,
    gate: Mutex<Gate>,
    state_tx: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<LinkEvent>,
}

impl Shared {
    /// Apply a state transition and notify every observer. The callback is
    /// invoked on every transition, including re-assertions of the current
    /// state, and never while the lock is held.
    fn transition(&self, new: ConnectionState, stamp: Stamp) {
        let old = {
            let mut gate = self.gate.lock();
            let old = gate.state;
            gate.state = new;
            match stamp {
                Stamp::Keep => {}
                Stamp::Clear => gate.last_failure = None,
                Stamp::At(at) => gate.last_failure = Some(at),
            }
            old
        };
        self.state_tx.send_replace(new);
        if let Some(callback) = &self.config.on_state_change {
            callback(new);
        }
        let _ = self.event_tx.send(LinkEvent::state_changed(old, new));
    }
}

/// Connection manager for the device's pub/sub session.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    tasks_started: AtomicBool,
}

impl ConnectionManager {
    /// Snapshot the configuration and resolve the effective client id.
    pub fn new(config: ManagerConfig, transport: Arc<dyn Transport>) -> Self {
        let link = Arc::new(LinkConfig {
            base_topic: config.base_topic.clone(),
            uplink_base_topic: config.uplink_base_topic.clone(),
            client_id: config.resolved_client_id(),
        });
        let router = Arc::new(CommandRouter::new(link.clone()));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                config,
                link,
                transport,
                router,
                gate: Mutex::new(Gate {
                    state: ConnectionState::Disconnected,
                    last_failure: None,
                }),
                state_tx,
                event_tx,
            }),
            tasks_started: AtomicBool::new(false),
        }
    }

    /// Register a command module under its topic prefix.
    ///
    /// Modules are registered during startup, before `start()`; the
    /// registry is read-only afterwards.
    pub fn register_module(&self, prefix: &str, handler: Arc<dyn CommandModule>) -> Result<()> {
        self.shared.router.register(prefix, handler)?;
        info!(prefix, "registered command module");
        Ok(())
    }

    /// Initialize the manager: validate and apply the configuration, spawn
    /// the background tasks (once), and issue one direct, ungated connect
    /// attempt.
    ///
    /// Until the first real failure event the reconnect gate stays closed,
    /// so initial connectivity rides entirely on this direct attempt.
    pub async fn start(&self) -> Result<()> {
        if self.shared.config.broker.trim().is_empty() {
            return Err(LinkError::Config("broker address is required".into()));
        }

        let transport_config = self
            .shared
            .config
            .transport_config(&self.shared.link.client_id);
        self.shared.transport.configure(&transport_config).await?;

        self.shared
            .transition(ConnectionState::Disconnected, Stamp::Clear);

        let handle = Handle::try_current().map_err(|err| {
            LinkError::ResourceExhausted(format!("cannot spawn manager tasks: {err}"))
        })?;
        if self
            .tasks_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            handle.spawn(run_event_loop(self.shared.clone()));
            handle.spawn(run_message_loop(self.shared.clone()));
            handle.spawn(run_step_loop(self.shared.clone()));
        }

        if let Err(err) = self.shared.transport.start().await {
            warn!(error = %err, "initial connect attempt failed to start");
        }

        Ok(())
    }

    /// Current link state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Watch channel following the link state.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Subscribe to link observability events.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Resolved topic configuration shared with command modules.
    pub fn link_config(&self) -> Arc<LinkConfig> {
        self.shared.link.clone()
    }
}

/// Next state for a transport event, and whether the event records a
/// failure. Any unrecognized event is folded into the error path.
fn apply_event(event: TransportEvent) -> (ConnectionState, bool) {
    match event {
        TransportEvent::Connected => (ConnectionState::Connected, false),
        TransportEvent::Disconnected => (ConnectionState::Disconnected, true),
        _ => (ConnectionState::Error, true),
    }
}

/// Wait required before a gated reconnect attempt. `None` disables
/// automatic retry entirely; an interval of zero retries on every tick.
fn reconnect_wait(interval_ms: i64) -> Option<Duration> {
    if interval_ms < 0 {
        None
    } else {
        Some(Duration::from_millis(interval_ms as u64))
    }
}

/// Whether enough time has passed since the last failure. With no failure
/// recorded the elapsed time counts as zero, so a positive wait keeps the
/// gate closed until a real failure event arrives.
fn gate_open(last_failure: Option<Instant>, now: Instant, wait: Duration) -> bool {
    let elapsed = match last_failure {
        Some(at) => now.saturating_duration_since(at),
        None => Duration::ZERO,
    };
    elapsed >= wait
}

/// Step interval with the default applied.
fn effective_step_interval(interval_ms: u64) -> Duration {
    if interval_ms == 0 {
        Duration::from_millis(DEFAULT_STEP_INTERVAL_MS)
    } else {
        Duration::from_millis(interval_ms)
    }
}

/// One tick of the recovery state machine. Never blocks: a closed gate
/// simply skips the tick.
async fn step(shared: &Shared) {
    let attempt = {
        let mut gate = shared.gate.lock();
        if !matches!(
            gate.state,
            ConnectionState::Disconnected | ConnectionState::Error
        ) {
            false
        } else {
            match reconnect_wait(shared.config.reconnect_interval_ms) {
                None => false,
                Some(wait) => {
                    let now = Instant::now();
                    if gate_open(gate.last_failure, now, wait) {
                        if gate.last_failure.is_none() {
                            // Stamp the first attempt so the gate does not
                            // re-trigger every tick before a real event
                            // arrives.
                            gate.last_failure = Some(now);
                        }
                        true
                    } else {
                        false
                    }
                }
            }
        }
    };

    if attempt {
        info!("attempting broker connection");
        shared.transition(ConnectionState::Connecting, Stamp::Keep);
        if let Err(err) = shared.transport.start().await {
            warn!(error = %err, "connect attempt failed to start");
        }
    }
}

async fn run_step_loop(shared: Arc<Shared>) {
    let interval = effective_step_interval(shared.config.step_interval_ms);
    loop {
        step(&shared).await;
        tokio::time::sleep(interval).await;
    }
}

async fn handle_transport_event(shared: &Shared, event: TransportEvent) {
    let (new_state, is_failure) = apply_event(event);
    match new_state {
        ConnectionState::Connected => {
            info!("mqtt connected");
            shared.transition(ConnectionState::Connected, Stamp::Clear);
            // Re-subscribe the command topics for this session; only then
            // is the link ready for business traffic.
            match shared.router.subscribe_all(shared.transport.as_ref()).await {
                Ok(()) => shared.transition(ConnectionState::Ready, Stamp::Keep),
                Err(err) => warn!(error = %err, "command topic subscription failed"),
            }
        }
        state => {
            warn!(%state, "mqtt session lost");
            let stamp = if is_failure {
                Stamp::At(Instant::now())
            } else {
                Stamp::Keep
            };
            shared.transition(state, stamp);
        }
    }
}

async fn run_event_loop(shared: Arc<Shared>) {
    let mut events = shared.transport.events();
    loop {
        match events.recv().await {
            Ok(event) => handle_transport_event(&shared, event).await,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "transport event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("transport event stream closed");
}

async fn run_message_loop(shared: Arc<Shared>) {
    let mut messages = shared.transport.messages();
    loop {
        match messages.recv().await {
            Ok(message) => {
                shared
                    .router
                    .dispatch(&message.topic, &message.payload)
                    .await;
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "inbound message stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("inbound message stream closed");
}
