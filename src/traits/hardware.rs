//! Hardware abstraction traits for the gate I/O, time, and delays.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`GateDrive`] | Motor direction outputs, warning lamp, limit-switch inputs |
//! | [`Clock`] | Monotonic time source for deadlines and cadence |
//! | [`Delay`] | Short blocking pauses (motor brake gap) |
//!
//! # Polarity
//!
//! The limit switches are wired active-low; the *logical* level crosses this
//! trait boundary. `limit_open()` returning `true` always means "the switch
//! is asserted", regardless of wire polarity. The ESP32 implementation maps
//! a low pin level to `true`.
//!
//! # Example
//!
//! ```rust
//! use rs_gate::traits::GateDrive;
//! use rs_gate::hal::MockGate;
//!
//! let mut io = MockGate::new();
//! io.set_limits(true, false);
//!
//! assert!(io.limit_open().unwrap());
//! io.set_motor_open(true).unwrap();
//! assert!(io.motor_open);
//! ```

/// Gate I/O trait - motor direction outputs, lamp, and limit-switch inputs.
///
/// Implement this trait for the board wiring. The gate FSM is the only
/// caller; it guarantees that the two motor outputs are never asserted at
/// the same time and interleaves a brake gap on direction changes.
///
/// # Implementation Notes
///
/// - Inputs return the *logical* asserted level (see the module docs on
///   polarity)
/// - Output setters must be idempotent; the FSM re-asserts safe levels on
///   entry to resting states
pub trait GateDrive {
    /// Error type for I/O operations.
    type Error;

    /// Energize or release the opening direction output.
    fn set_motor_open(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Energize or release the closing direction output.
    fn set_motor_close(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Switch the warning lamp output.
    fn set_lamp(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Read the fully-open limit switch (logical: `true` = asserted).
    fn limit_open(&mut self) -> Result<bool, Self::Error>;

    /// Read the fully-closed limit switch (logical: `true` = asserted).
    fn limit_closed(&mut self) -> Result<bool, Self::Error>;

    /// Convenience method to release both motor outputs.
    fn motor_stop(&mut self) -> Result<(), Self::Error> {
        self.set_motor_open(false)?;
        self.set_motor_close(false)
    }
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for motion deadlines, debounce
/// windows, and telemetry cadence. On desktop this can wrap
/// `std::time::Instant`; on ESP32 it reads the hardware timer.
///
/// # Example
///
/// ```rust
/// use rs_gate::traits::Clock;
/// use rs_gate::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

/// Short blocking delay trait.
///
/// The FSM uses this for the motor brake gap only: a pause of at least
/// 10 ms between releasing one direction output and energizing the other.
/// On ESP32 this yields to the scheduler; the mock just records the call.
pub trait Delay {
    /// Block for the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}
