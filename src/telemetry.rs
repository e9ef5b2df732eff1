//! Status and telemetry publication.
//!
//! Two outbound streams share one payload shape:
//!
//! - **Status** (`topic_status`): published whenever the gate state changes.
//! - **Telemetry** (`topic_tele`): published every [`PUB_PERIOD_MS`]
//!   regardless of transitions.
//!
//! Both are retained and sent with QoS 1 so that dashboards reconnecting to
//! the broker immediately see the last known state. Publication is a no-op
//! when the target topic is empty.
//!
//! # Payload
//!
//! ```json
//! {"state":"CERRADO","lsa_open":false,"lsc_closed":true,
//!  "motor_open":false,"motor_close":false,"err":0}
//! ```
//!
//! The `err` field is omitted only in the synthetic "just connected" status
//! that the broker channel emits on connect.

use crate::config::BrokerConfig;
use crate::gate::{GateSnapshot, GateState};
use crate::traits::MqttClient;
use alloc::format;
use alloc::string::String;

/// Period of the telemetry stream in milliseconds.
pub const PUB_PERIOD_MS: u64 = 30_000;

/// Build the status/telemetry JSON payload for a snapshot.
///
/// `include_err` is false only for the broker channel's connect
/// announcement.
///
/// # Example
///
/// ```rust
/// use rs_gate::{status_payload, GateSnapshot, GateState};
///
/// let snap = GateSnapshot {
///     state: GateState::Closed,
///     limit_closed: true,
///     ..GateSnapshot::default()
/// };
/// let json = status_payload(&snap, true);
/// assert!(json.contains(r#""state":"CERRADO""#));
/// assert!(json.contains(r#""err":0"#));
/// ```
pub fn status_payload(snap: &GateSnapshot, include_err: bool) -> String {
    if include_err {
        format!(
            r#"{{"state":"{}","lsa_open":{},"lsc_closed":{},"motor_open":{},"motor_close":{},"err":{}}}"#,
            snap.state.as_str(),
            snap.limit_open,
            snap.limit_closed,
            snap.motor_opening,
            snap.motor_closing,
            snap.error_code.code(),
        )
    } else {
        format!(
            r#"{{"state":"{}","lsa_open":{},"lsc_closed":{},"motor_open":{},"motor_close":{}}}"#,
            snap.state.as_str(),
            snap.limit_open,
            snap.limit_closed,
            snap.motor_opening,
            snap.motor_closing,
        )
    }
}

/// Drives the two outbound streams from FSM snapshots.
///
/// The publisher holds the change-detection sentinel (`None` until the
/// first publication, so the very first cycle always reports) and the
/// telemetry timer. It is called once per FSM cycle, after the step.
///
/// # Example
///
/// ```rust
/// use rs_gate::{BrokerConfig, GateSnapshot, StatusPublisher};
/// use rs_gate::hal::MockMqtt;
///
/// let broker = BrokerConfig::default().with_topics("g/cmd", "g/status", "g/tele");
/// let mut mqtt = MockMqtt::new();
/// let mut publisher = StatusPublisher::new(0);
///
/// publisher.tick(&GateSnapshot::default(), 0, &mut mqtt, &broker);
/// assert_eq!(mqtt.published_to("g/status").len(), 1); // first state reported
/// ```
pub struct StatusPublisher {
    last_state: Option<GateState>,
    last_tele_ms: u64,
}

impl StatusPublisher {
    /// Create a publisher; `now_ms` seeds the telemetry timer so the first
    /// periodic message fires one full period after start.
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_state: None,
            last_tele_ms: now_ms,
        }
    }

    /// Publish pending status/telemetry for this cycle.
    ///
    /// Emits at most one status message (on state change) and at most one
    /// telemetry message (on period expiry). Publish errors are logged and
    /// swallowed; the broker channel recovers the session on its own.
    pub fn tick<M: MqttClient>(
        &mut self,
        snap: &GateSnapshot,
        now_ms: u64,
        mqtt: &mut M,
        broker: &BrokerConfig,
    ) {
        if self.last_state != Some(snap.state) {
            self.last_state = Some(snap.state);
            log::info!("estado => {}", snap.state.as_str());
            Self::publish(mqtt, &broker.topic_status, snap);
        }

        if now_ms.saturating_sub(self.last_tele_ms) >= PUB_PERIOD_MS {
            self.last_tele_ms = now_ms;
            Self::publish(mqtt, &broker.topic_tele, snap);
        }
    }

    fn publish<M: MqttClient>(mqtt: &mut M, topic: &str, snap: &GateSnapshot) {
        if topic.is_empty() {
            return;
        }
        let payload = status_payload(snap, true);
        if mqtt.publish(topic, payload.as_bytes(), true).is_err() {
            log::warn!("publish to '{}' failed", topic);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
