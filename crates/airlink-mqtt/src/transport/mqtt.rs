//! `rumqttc`-backed transport collaborator.
//!
//! Maps the rumqttc event loop onto the [`Transport`] surface the manager
//! expects: `start()` spawns one poll task per connect attempt, a
//! successful `ConnAck` becomes [`TransportEvent::Connected`], and any
//! poll error ends the attempt with a `Disconnected`/`Error` event. The
//! manager's gate decides when the next attempt happens; this adapter
//! never retries on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use airlink_core::{
    InboundMessage, LinkError, QoS, Result, Transport, TransportConfig, TransportEvent,
};

const CHANNEL_CAPACITY: usize = 256;
const REQUEST_CHANNEL_CAPACITY: usize = 10;

fn map_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
    }
}

/// MQTT transport over rumqttc.
pub struct MqttTransport {
    options: Mutex<Option<MqttOptions>>,
    client: Arc<Mutex<Option<AsyncClient>>>,
    attempt_active: Arc<AtomicBool>,
    event_tx: broadcast::Sender<TransportEvent>,
    message_tx: broadcast::Sender<InboundMessage>,
}

impl MqttTransport {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (message_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            options: Mutex::new(None),
            client: Arc::new(Mutex::new(None)),
            attempt_active: Arc::new(AtomicBool::new(false)),
            event_tx,
            message_tx,
        }
    }

    fn current_client(&self) -> Result<AsyncClient> {
        self.client
            .lock()
            .clone()
            .ok_or_else(|| LinkError::Transport("no active mqtt session".into()))
    }
}

impl Default for MqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn configure(&self, config: &TransportConfig) -> Result<()> {
        if config.broker.trim().is_empty() {
            return Err(LinkError::Config("broker host is required".into()));
        }
        let mut options =
            MqttOptions::new(config.client_id.clone(), config.broker.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs));
        options.set_clean_session(config.clean_session);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }
        *self.options.lock() = Some(options);
        debug!(
            broker = %config.broker,
            port = config.port,
            client_id = %config.client_id,
            "mqtt transport configured"
        );
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let options = self
            .options
            .lock()
            .clone()
            .ok_or_else(|| LinkError::Config("transport not configured".into()))?;

        // At most one connect attempt in flight.
        if self.attempt_active.swap(true, Ordering::SeqCst) {
            debug!("connect attempt already in flight");
            return Ok(());
        }

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        *self.client.lock() = Some(client);

        let event_tx = self.event_tx.clone();
        let message_tx = self.message_tx.clone();
        let attempt_active = self.attempt_active.clone();
        let client_slot = self.client.clone();

        tokio::spawn(async move {
            let mut connected = false;
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            info!("broker accepted connection");
                            connected = true;
                            let _ = event_tx.send(TransportEvent::Connected);
                        } else {
                            warn!(code = ?ack.code, "broker refused connection");
                            let _ = event_tx.send(TransportEvent::Error);
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let _ = message_tx.send(InboundMessage::new(
                            publish.topic.clone(),
                            publish.payload.to_vec(),
                        ));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "mqtt event loop error");
                        let event = if connected {
                            TransportEvent::Disconnected
                        } else {
                            TransportEvent::Error
                        };
                        let _ = event_tx.send(event);
                        break;
                    }
                }
            }
            *client_slot.lock() = None;
            attempt_active.store(false, Ordering::SeqCst);
        });

        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()> {
        let client = self.current_client()?;
        client
            .publish(topic, map_qos(qos), retain, payload.to_vec())
            .await
            .map_err(|err| LinkError::Transport(err.to_string()))
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        let client = self.current_client()?;
        client
            .subscribe(topic, rumqttc::QoS::AtLeastOnce)
            .await
            .map_err(|err| LinkError::Transport(err.to_string()))
    }

    fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.event_tx.subscribe()
    }

    fn messages(&self) -> broadcast::Receiver<InboundMessage> {
        self.message_tx.subscribe()
    }
}
