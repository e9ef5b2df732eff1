//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware, network, and storage
//! traits, enabling development and testing on desktop without a gate.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockGate`] | [`GateDrive`] | Scripted limit levels, recorded output writes |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockDelay`] | [`Delay`] | Records requested pauses |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//! | [`MemStore`] | [`ConfigStore`] | In-memory key/value map |
//!
//! # Example
//!
//! ```rust
//! use rs_gate::{CommandQueue, GateCommand, GateFsm, GateState};
//! use rs_gate::hal::{MockDelay, MockGate};
//!
//! let mut io = MockGate::new();
//! io.set_limits(false, true);
//!
//! let mut fsm = GateFsm::new(io, MockDelay::new());
//! let mut queue: CommandQueue<16> = CommandQueue::new();
//! fsm.step(&mut queue, 0).unwrap();
//!
//! assert_eq!(fsm.state(), GateState::Closed);
//! ```
//!
//! [`GateDrive`]: crate::traits::GateDrive
//! [`Clock`]: crate::traits::Clock
//! [`Delay`]: crate::traits::Delay
//! [`MqttClient`]: crate::traits::MqttClient
//! [`ConfigStore`]: crate::traits::ConfigStore

use crate::traits::{Clock, ConfigStore, Delay, GateDrive, MqttClient, MqttMessage};

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

// ============================================================================
// Gate I/O Mock
// ============================================================================

/// One recorded output write, in call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorWrite {
    /// `set_motor_open(level)`
    Open(bool),
    /// `set_motor_close(level)`
    Close(bool),
    /// `set_lamp(level)`
    Lamp(bool),
}

/// Mock gate I/O for testing.
///
/// Limit levels are public fields scripted by the test; output writes are
/// both mirrored into public fields and appended to [`writes`](Self::writes)
/// so tests can assert ordering (e.g. the brake-gap interleaving on a
/// reversal).
///
/// # Example
///
/// ```rust
/// use rs_gate::hal::{MockGate, MotorWrite};
/// use rs_gate::traits::GateDrive;
///
/// let mut io = MockGate::new();
/// io.set_motor_open(true).unwrap();
/// io.set_motor_open(false).unwrap();
///
/// assert_eq!(io.writes, vec![MotorWrite::Open(true), MotorWrite::Open(false)]);
/// ```
#[derive(Debug, Default)]
pub struct MockGate {
    /// Scripted fully-open limit level (logical: `true` = asserted).
    pub raw_limit_open: bool,
    /// Scripted fully-closed limit level.
    pub raw_limit_closed: bool,
    /// Current opening output level.
    pub motor_open: bool,
    /// Current closing output level.
    pub motor_close: bool,
    /// Current lamp output level.
    pub lamp: bool,
    /// Every output write in call order.
    pub writes: Vec<MotorWrite>,
}

impl MockGate {
    /// Creates a mock gate with both limits released and outputs off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script both limit switch levels at once.
    pub fn set_limits(&mut self, open: bool, closed: bool) {
        self.raw_limit_open = open;
        self.raw_limit_closed = closed;
    }

    /// True if both motor outputs are currently released.
    pub fn motor_is_stopped(&self) -> bool {
        !self.motor_open && !self.motor_close
    }
}

impl GateDrive for MockGate {
    type Error = ();

    fn set_motor_open(&mut self, on: bool) -> Result<(), ()> {
        self.motor_open = on;
        self.writes.push(MotorWrite::Open(on));
        Ok(())
    }

    fn set_motor_close(&mut self, on: bool) -> Result<(), ()> {
        self.motor_close = on;
        self.writes.push(MotorWrite::Close(on));
        Ok(())
    }

    fn set_lamp(&mut self, on: bool) -> Result<(), ()> {
        self.lamp = on;
        self.writes.push(MotorWrite::Lamp(on));
        Ok(())
    }

    fn limit_open(&mut self) -> Result<bool, ()> {
        Ok(self.raw_limit_open)
    }

    fn limit_closed(&mut self) -> Result<bool, ()> {
        Ok(self.raw_limit_closed)
    }
}

// ============================================================================
// Clock and Delay Mocks
// ============================================================================

/// Mock clock for testing.
///
/// # Example
///
/// ```rust
/// use rs_gate::hal::MockClock;
/// use rs_gate::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0 ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

/// Mock delay that records every requested pause instead of sleeping.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Every `delay_ms` argument, in call order.
    pub calls: Vec<u32>,
}

impl MockDelay {
    /// Creates a new mock delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total milliseconds requested so far.
    pub fn total_ms(&self) -> u64 {
        self.calls.iter().map(|&ms| ms as u64).sum()
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
    }
}

// ============================================================================
// MQTT Mock
// ============================================================================

/// Mock MQTT client for testing.
///
/// Records all publish/subscribe operations and allows injecting incoming
/// messages for testing decode paths.
///
/// # Example
///
/// ```rust
/// use rs_gate::hal::MockMqtt;
/// use rs_gate::traits::MqttClient;
///
/// let mut mqtt = MockMqtt::new();
/// mqtt.publish("gate/status", b"{}", true).unwrap();
///
/// assert_eq!(mqtt.published_to("gate/status").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<String>,
    /// Injected inbound messages.
    pub incoming: Vec<MqttMessage>,
    /// Whether the client reports itself connected.
    pub connected: bool,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue an incoming message.
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(MqttMessage {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    /// Check if a topic was subscribed to.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Get published messages for a topic.
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// Storage Mock
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum StoredValue {
    Str(String),
    Byte(u8),
}

/// In-memory key/value store for testing the configuration record.
///
/// # Example
///
/// ```rust
/// use rs_gate::hal::MemStore;
/// use rs_gate::traits::ConfigStore;
///
/// let mut store = MemStore::new();
/// store.set_str("wifi_ssid", "net").unwrap();
/// assert_eq!(store.get_str("wifi_ssid").unwrap().as_deref(), Some("net"));
///
/// store.erase("wifi_ssid").unwrap();
/// assert_eq!(store.get_str("wifi_ssid").unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct MemStore {
    map: BTreeMap<String, StoredValue>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl ConfigStore for MemStore {
    type Error = core::convert::Infallible;

    fn get_str(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(match self.map.get(key) {
            Some(StoredValue::Str(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.map
            .insert(key.to_string(), StoredValue::Str(value.to_string()));
        Ok(())
    }

    fn get_u8(&self, key: &str) -> Result<Option<u8>, Self::Error> {
        Ok(match self.map.get(key) {
            Some(StoredValue::Byte(b)) => Some(*b),
            _ => None,
        })
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), Self::Error> {
        self.map.insert(key.to_string(), StoredValue::Byte(value));
        Ok(())
    }

    fn erase(&mut self, key: &str) -> Result<(), Self::Error> {
        self.map.remove(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
