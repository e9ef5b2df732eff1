//! The broker channel: MQTT client lifecycle on ESP32.
//!
//! Starts only when a broker URI is configured. On connect it subscribes to
//! the command topic (QoS 1) and announces itself with one status message
//! (without the `err` field). Inbound payloads are decoded on the client's
//! event thread and enqueued into the bounded command queue - the FSM is
//! never called from here.
//!
//! `restart()` tears the client down and rebuilds it from the current
//! configuration; the portal invokes it on every broker form submission.

use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Result;
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};

use crate::commands::{CommandQueue, COMMAND_QUEUE_DEPTH};
use crate::config::BrokerConfig;
use crate::gate::GateSnapshot;
use crate::messages::parse_command;
use crate::telemetry::status_payload;
use crate::traits::MqttClient;

/// Broker keepalive in seconds.
const KEEP_ALIVE_SECS: u64 = 30;

/// Queue handle shared between the broker event thread and the FSM task.
pub type SharedCommandQueue = Arc<Mutex<CommandQueue<COMMAND_QUEUE_DEPTH>>>;

/// Snapshot handle kept current by the FSM task; read here for the connect
/// announcement.
pub type SharedSnapshot = Arc<Mutex<GateSnapshot>>;

/// Owns the MQTT client and its restart policy.
pub struct BrokerChannel {
    client: Option<Arc<Mutex<EspMqttClient<'static>>>>,
    config: BrokerConfig,
    queue: SharedCommandQueue,
    snapshot: SharedSnapshot,
}

impl BrokerChannel {
    /// Create the channel and start it if a broker URI is configured.
    pub fn new(
        config: BrokerConfig,
        queue: SharedCommandQueue,
        snapshot: SharedSnapshot,
    ) -> Result<Self> {
        let mut channel = Self {
            client: None,
            config,
            queue,
            snapshot,
        };
        channel.start()?;
        Ok(channel)
    }

    /// Start the client. A channel without a broker URI stays dormant; the
    /// FSM runs regardless.
    pub fn start(&mut self) -> Result<()> {
        if !self.config.is_configured() {
            log::warn!("broker channel not started: empty uri");
            return Ok(());
        }

        let mqtt_config = MqttClientConfiguration {
            keep_alive_interval: Some(std::time::Duration::from_secs(KEEP_ALIVE_SECS)),
            disable_clean_session: false,
            ..Default::default()
        };

        let (client, connection) = EspMqttClient::new(self.config.uri.as_str(), &mqtt_config)?;
        let client = Arc::new(Mutex::new(client));

        let event_client = Arc::clone(&client);
        let queue = Arc::clone(&self.queue);
        let snapshot = Arc::clone(&self.snapshot);
        let config = self.config.clone();
        thread::Builder::new()
            .name("mqtt_events".into())
            .stack_size(6144)
            .spawn(move || handle_events(connection, event_client, queue, snapshot, config))?;

        log::info!("broker channel started ({})", self.config.uri);
        self.client = Some(client);
        Ok(())
    }

    /// Stop and destroy the current client instance.
    pub fn stop(&mut self) {
        if self.client.take().is_some() {
            // Dropping the client closes the connection; the event thread
            // sees the stream end and exits.
            log::info!("broker channel stopped");
        }
    }

    /// Stop, adopt the given configuration, and start again.
    pub fn restart(&mut self, config: BrokerConfig) -> Result<()> {
        self.stop();
        self.config = config;
        self.start()
    }

    /// The active configuration.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }
}

impl MqttClient for BrokerChannel {
    type Error = anyhow::Error;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        // Dormant channel: publications are silently dropped.
        let Some(client) = &self.client else {
            return Ok(());
        };
        client
            .lock()
            .unwrap()
            .publish(topic, QoS::AtLeastOnce, retain, payload)?;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        client.lock().unwrap().subscribe(topic, QoS::AtLeastOnce)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}

/// Event loop for one client instance. Returns when the connection stream
/// ends (client dropped by `stop`/`restart`).
fn handle_events(
    mut connection: EspMqttConnection,
    client: Arc<Mutex<EspMqttClient<'static>>>,
    queue: SharedCommandQueue,
    snapshot: SharedSnapshot,
    config: BrokerConfig,
) {
    while let Ok(event) = connection.next() {
        match event.payload() {
            EventPayload::Connected(_) => {
                log::info!("mqtt connected ({})", config.uri);
                if !config.topic_cmd.is_empty() {
                    if let Err(e) = client
                        .lock()
                        .unwrap()
                        .subscribe(config.topic_cmd.as_str(), QoS::AtLeastOnce)
                    {
                        log::warn!("subscribe '{}' failed: {:?}", config.topic_cmd, e);
                    }
                }
                // Connect announcement carries no err field.
                if !config.topic_status.is_empty() {
                    let snap = *snapshot.lock().unwrap();
                    let payload = status_payload(&snap, false);
                    let _ = client.lock().unwrap().publish(
                        config.topic_status.as_str(),
                        QoS::AtLeastOnce,
                        true,
                        payload.as_bytes(),
                    );
                }
            }
            EventPayload::Received { data, .. } => match parse_command(data) {
                Some(cmd) => {
                    let accepted = queue.lock().unwrap().push(cmd);
                    if !accepted {
                        log::warn!("command queue full, {} dropped", cmd.as_str());
                    }
                }
                None => log::warn!("unparseable command payload ({} bytes)", data.len()),
            },
            EventPayload::Error(e) => log::warn!("mqtt error: {:?}", e),
            _ => {}
        }
    }
    log::info!("mqtt event thread exiting");
}
