//! ESP32 hardware bindings for the gate controller.
//!
//! The board drives the motor contactors and the warning lamp through plain
//! GPIO outputs and reads the two end-of-travel switches as active-low
//! inputs.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32 (ESP-IDF, std)
//! - **Motor**: two relay/contactor outputs, one per direction
//! - **Limit switches**: mechanical contacts to ground, active-low
//! - **Lamp**: one relay output
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for the GPIO numbers.

mod clock;
mod gpio;
mod http;
mod mqtt;
mod nvs;
mod wifi;

pub use clock::{Esp32Clock, Esp32Delay};
pub use gpio::Esp32Gate;
pub use http::{PortalContext, PortalServer};
pub use mqtt::BrokerChannel;
pub use nvs::NvsStore;
pub use wifi::WifiSupervisor;

/// Pin assignments for the gate controller board.
pub mod pins {
    // =========================================================================
    // Limit switches (inputs, active-low)
    // =========================================================================

    /// Fully-open limit switch (LSA).
    pub const LIMIT_OPEN: i32 = 34;

    /// Fully-closed limit switch (LSC).
    pub const LIMIT_CLOSED: i32 = 35;

    // =========================================================================
    // Outputs
    // =========================================================================

    /// Opening direction contactor.
    pub const MOTOR_OPEN: i32 = 13;

    /// Closing direction contactor.
    pub const MOTOR_CLOSE: i32 = 12;

    /// Warning lamp.
    pub const LAMP: i32 = 2;
}
