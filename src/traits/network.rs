//! Network abstraction for the MQTT broker channel.
//!
//! The gate publishes to two topics and subscribes to one:
//!
//! ```text
//! <topic_cmd>    - inbound {"cmd": "..."} command payloads
//! <topic_status> - status JSON, published on every state change (retained)
//! <topic_tele>   - the same JSON, published every 30 s (retained)
//! ```
//!
//! This trait uses a **sync-first design**: publish and subscribe block
//! briefly on the client, which is fine from the telemetry path (the broker
//! client queues outbound messages internally). Inbound traffic does not
//! flow through this trait at all - the platform broker channel decodes
//! payloads on its own event thread and enqueues commands into the bounded
//! command queue.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

/// MQTT client trait for the broker channel.
///
/// # Implementation Notes
///
/// - `publish` with `retain = true` is sent with QoS 1 (the status and
///   telemetry streams are both retained, at-least-once)
/// - Implementations should be tolerant of a missing connection: publishing
///   while disconnected is allowed to fail silently upstream
///
/// # Example
///
/// ```rust,ignore
/// use rs_gate::traits::MqttClient;
///
/// fn announce<M: MqttClient>(client: &mut M, topic: &str) {
///     let _ = client.publish(topic, b"{\"state\":\"CERRADO\"}", true);
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, the broker keeps the message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Subscribe to a topic with QoS 1.
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Check if connected to the broker.
    fn is_connected(&self) -> bool;
}

/// An MQTT message received from a subscription.
///
/// Used by the mock client and the platform event plumbing.
#[derive(Clone, Debug)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new MQTT message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}
