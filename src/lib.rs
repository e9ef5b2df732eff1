//! # rs-gate
//!
//! Firmware for a motorized swinging/sliding gate controller with MQTT
//! remote control and a captive Wi-Fi provisioning portal.
//!
//! ## Features
//!
//! - **Gate state machine**: fuses debounced limit switches, queued commands,
//!   and bounded motion deadlines into safe motor and lamp outputs
//! - **Remote control**: a small command alphabet (`OPEN`, `CLOSE`, `STOP`,
//!   `TOGGLE`, `LAMP_ON`, `LAMP_OFF`) delivered over an MQTT command topic
//! - **Telemetry**: change-driven status plus periodic telemetry on separate
//!   topics, retained with QoS 1
//! - **Provisioning portal**: a single-page HTTP portal for Wi-Fi and broker
//!   configuration, with a 30-second connect watchdog that falls back to the
//!   configuration access point on stall
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware, network, and storage abstractions
//! - `gate` - The gate finite state machine and its motion rules
//! - `commands` - Command alphabet and the bounded command queue
//! - `config` - Persistent configuration record and its key/value layout
//! - `connectivity` - Boot-mode resolution and the connect watchdog
//! - `portal` - Form parsing, URL decoding, and page rendering for the portal
//! - `telemetry` - Status/telemetry payloads and publication policy
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_gate::{
//!     CommandQueue, GateCommand, GateFsm, GateState,
//!     hal::{MockDelay, MockGate},
//! };
//!
//! // Gate resting on the closed limit switch.
//! let mut io = MockGate::new();
//! io.set_limits(false, true);
//!
//! let mut fsm = GateFsm::new(io, MockDelay::new());
//! let mut queue: CommandQueue<16> = CommandQueue::new();
//!
//! // First cycle classifies the gate from its limit switches.
//! fsm.step(&mut queue, 0).unwrap();
//! assert_eq!(fsm.state(), GateState::Closed);
//!
//! // An OPEN command starts the motor in the opening direction.
//! let _ = queue.push(GateCommand::Open);
//! fsm.step(&mut queue, 20).unwrap();
//! assert_eq!(fsm.state(), GateState::Opening);
//! assert!(fsm.snapshot().motor_opening);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Command alphabet and the bounded FIFO command queue.
pub mod commands;
/// Persistent configuration record and its key/value storage layout.
pub mod config;
/// Boot-mode resolution and the bounded connect watchdog.
pub mod connectivity;
/// Stable-window filtering for the limit-switch inputs.
pub mod debounce;
/// The gate finite state machine: states, deadlines, motor rules.
pub mod gate;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Form parsing, URL decoding, and page rendering for the provisioning portal.
pub mod portal;
/// Status and telemetry payloads and their publication policy.
pub mod telemetry;
/// Core traits for hardware, network, and storage abstraction.
pub mod traits;

/// Typed inbound command payloads (serde-based).
#[cfg(feature = "serde")]
pub mod messages;

// Re-exports for convenience
pub use commands::{CommandQueue, GateCommand, COMMAND_QUEUE_DEPTH};
pub use config::{BootMode, BrokerConfig, GateConfig, WifiCredentials};
pub use connectivity::{resolve_start_mode, ConnectWatchdog, StartMode, CONNECT_TIMEOUT_MS};
pub use debounce::Debouncer;
pub use gate::{
    ErrorCode, GateFsm, GateSnapshot, GateState, DEBOUNCE_MS, MOTOR_BRAKE_GAP_MS, T_CLOSE_MS,
    T_OPEN_MS,
};
pub use telemetry::{status_payload, StatusPublisher, PUB_PERIOD_MS};
pub use traits::{Clock, ConfigStore, Delay, GateDrive, MqttClient};

#[cfg(feature = "serde-json-core")]
pub use messages::parse_command;
