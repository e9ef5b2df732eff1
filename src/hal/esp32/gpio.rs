//! Gate I/O over ESP32 GPIO.
//!
//! The two limit switches are mechanical contacts to ground: the wire level
//! is low when the switch is asserted. This module converts to the logical
//! polarity required by [`GateDrive`], so the FSM never sees the wiring
//! convention.

use crate::traits::GateDrive;
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

/// Gate I/O on ESP32 GPIO pins.
///
/// The limit inputs live on GPIO 34/35, which are input-only pins without
/// internal pulls; the board provides external pull-ups.
///
/// # Example
///
/// ```ignore
/// use esp_idf_hal::peripherals::Peripherals;
/// use rs_gate::hal::esp32::Esp32Gate;
///
/// let p = Peripherals::take()?;
/// let io = Esp32Gate::new(
///     p.pins.gpio34.downgrade_input(),
///     p.pins.gpio35.downgrade_input(),
///     p.pins.gpio13.downgrade_output(),
///     p.pins.gpio12.downgrade_output(),
///     p.pins.gpio2.downgrade_output(),
/// )?;
/// ```
pub struct Esp32Gate<'d> {
    limit_open: PinDriver<'d, AnyInputPin, Input>,
    limit_closed: PinDriver<'d, AnyInputPin, Input>,
    motor_open: PinDriver<'d, AnyOutputPin, Output>,
    motor_close: PinDriver<'d, AnyOutputPin, Output>,
    lamp: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> Esp32Gate<'d> {
    /// Creates the gate I/O and forces all outputs to their safe level.
    ///
    /// # Errors
    ///
    /// Returns an error if any pin driver fails to initialize.
    pub fn new(
        limit_open: impl Peripheral<P = AnyInputPin> + 'd,
        limit_closed: impl Peripheral<P = AnyInputPin> + 'd,
        motor_open: impl Peripheral<P = AnyOutputPin> + 'd,
        motor_close: impl Peripheral<P = AnyOutputPin> + 'd,
        lamp: impl Peripheral<P = AnyOutputPin> + 'd,
    ) -> Result<Self, EspError> {
        let limit_open = PinDriver::input(limit_open)?;
        let limit_closed = PinDriver::input(limit_closed)?;

        let mut gate = Self {
            limit_open,
            limit_closed,
            motor_open: PinDriver::output(motor_open)?,
            motor_close: PinDriver::output(motor_close)?,
            lamp: PinDriver::output(lamp)?,
        };

        gate.motor_open.set_low()?;
        gate.motor_close.set_low()?;
        gate.lamp.set_low()?;

        Ok(gate)
    }
}

impl GateDrive for Esp32Gate<'_> {
    type Error = EspError;

    fn set_motor_open(&mut self, on: bool) -> Result<(), EspError> {
        if on {
            self.motor_open.set_high()
        } else {
            self.motor_open.set_low()
        }
    }

    fn set_motor_close(&mut self, on: bool) -> Result<(), EspError> {
        if on {
            self.motor_close.set_high()
        } else {
            self.motor_close.set_low()
        }
    }

    fn set_lamp(&mut self, on: bool) -> Result<(), EspError> {
        if on {
            self.lamp.set_high()
        } else {
            self.lamp.set_low()
        }
    }

    fn limit_open(&mut self) -> Result<bool, EspError> {
        // Active-low wire: asserted when the pin reads low.
        Ok(self.limit_open.is_low())
    }

    fn limit_closed(&mut self) -> Result<bool, EspError> {
        Ok(self.limit_closed.is_low())
    }
}
