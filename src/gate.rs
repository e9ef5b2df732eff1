//! The gate finite state machine.
//!
//! This module provides [`GateFsm`], the central component that maps the
//! joint inputs (debounced limit switches, queued commands, motion deadline)
//! onto safe motor and lamp outputs.
//!
//! # Overview
//!
//! The FSM:
//! - Debounces both limit switches on every cycle
//! - Treats the joint assertion of both limits as a physical fault
//! - Enforces a 15-second deadline on every opening or closing motion
//! - Consumes at most one queued command per cycle
//! - Never energizes both motor directions, and interleaves a brake gap on
//!   reversals
//!
//! # Example
//!
//! ```rust
//! use rs_gate::{
//!     CommandQueue, GateCommand, GateFsm, GateState,
//!     hal::{MockDelay, MockGate},
//! };
//!
//! let mut io = MockGate::new();
//! io.set_limits(false, true); // resting on the closed limit
//!
//! let mut fsm = GateFsm::new(io, MockDelay::new());
//! let mut queue: CommandQueue<16> = CommandQueue::new();
//!
//! fsm.step(&mut queue, 0).unwrap();
//! assert_eq!(fsm.state(), GateState::Closed);
//!
//! let _ = queue.push(GateCommand::Open);
//! fsm.step(&mut queue, 20).unwrap();
//! assert_eq!(fsm.state(), GateState::Opening);
//! ```
//!
//! # Cycle Order
//!
//! Within one [`GateFsm::step`] call the order is fixed: sensors, emergency
//! check (both limits asserted), position-based transition, one command.
//! A command observed in cycle *n* is acted upon no later than the end of
//! cycle *n*. Telemetry is driven by the caller from the post-step
//! [snapshot](GateFsm::snapshot).

use crate::commands::{CommandQueue, GateCommand};
use crate::debounce::Debouncer;
use crate::traits::{Delay, GateDrive};

/// Limit-switch stability window in milliseconds.
pub const DEBOUNCE_MS: u64 = 20;
/// Upper bound on one opening motion, milliseconds.
pub const T_OPEN_MS: u64 = 15_000;
/// Upper bound on one closing motion, milliseconds.
pub const T_CLOSE_MS: u64 = 15_000;
/// Pause between releasing one motor direction and energizing the other.
pub const MOTOR_BRAKE_GAP_MS: u32 = 10;
/// FSM cycle period while the gate is at rest.
pub const CYCLE_IDLE_MS: u64 = 20;
/// FSM cycle period while the gate is moving.
pub const CYCLE_MOVING_MS: u64 = 10;

// ============================================================================
// States and error codes
// ============================================================================

/// The externally visible gate state.
///
/// The wire names ([`GateState::as_str`]) are kept verbatim from the
/// deployed dashboards and are therefore Spanish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GateState {
    /// Power-on state; the first cycle classifies the gate from its limits.
    Initial,
    /// Fault latch; see [`ErrorCode`] for the cause.
    Error,
    /// Motor driving toward the open limit.
    Opening,
    /// Resting on the open limit.
    Open,
    /// Motor driving toward the closed limit.
    Closing,
    /// Resting on the closed limit.
    Closed,
    /// Motion halted mid-travel by a STOP or TOGGLE.
    Stopped,
    /// At rest with neither limit asserted (position unknown).
    Unknown,
}

impl GateState {
    /// The wire name used in status and telemetry payloads.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GateState::Initial => "INICIAL",
            GateState::Error => "ERROR",
            GateState::Opening => "ABRIENDO",
            GateState::Open => "ABIERTO",
            GateState::Closing => "CERRANDO",
            GateState::Closed => "CERRADO",
            GateState::Stopped => "DETENIDO",
            GateState::Unknown => "DESCONOCIDO",
        }
    }

    /// True while a motor direction is energized.
    #[inline]
    pub const fn is_moving(&self) -> bool {
        matches!(self, GateState::Opening | GateState::Closing)
    }
}

/// Cause of the most recent fault.
///
/// The code is **sticky**: recovering from [`GateState::Error`] does not
/// reset it, so operators can read the last fault after the gate resumes.
/// Only the next fault overwrites it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorCode {
    /// No fault has occurred.
    #[default]
    Ok = 0,
    /// The open limit did not assert within [`T_OPEN_MS`].
    TimeoutOpen = 1,
    /// The closed limit did not assert within [`T_CLOSE_MS`].
    TimeoutClose = 2,
    /// Both limit switches asserted at once (physically impossible).
    LimitsInconsistent = 3,
    /// Reserved for dispatch guardrails: a state value outside the alphabet.
    StateGuardrail = 99,
}

impl ErrorCode {
    /// Numeric code used in the `err` payload field.
    #[inline]
    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// A point-in-time copy of the externally visible FSM state.
///
/// Produced by [`GateFsm::snapshot`] after each cycle; this is what the
/// telemetry publisher and the provisioning portal read. `error_code` is
/// sticky across recovery (see [`ErrorCode`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateSnapshot {
    /// Current gate state.
    pub state: GateState,
    /// Debounced fully-open limit switch.
    pub limit_open: bool,
    /// Debounced fully-closed limit switch.
    pub limit_closed: bool,
    /// Opening direction output energized.
    pub motor_opening: bool,
    /// Closing direction output energized.
    pub motor_closing: bool,
    /// Warning lamp output.
    pub lamp: bool,
    /// Last fault code.
    pub error_code: ErrorCode,
}

impl Default for GateSnapshot {
    fn default() -> Self {
        Self {
            state: GateState::Initial,
            limit_open: false,
            limit_closed: false,
            motor_opening: false,
            motor_closing: false,
            lamp: false,
            error_code: ErrorCode::Ok,
        }
    }
}

// ============================================================================
// The FSM
// ============================================================================

/// The gate state machine.
///
/// Owns the motor and lamp outputs through a [`GateDrive`] and is their sole
/// writer. The conceptual per-state loops of the control design are
/// flattened into one dispatch: every [`step`](Self::step) call runs exactly
/// one cycle of the current state.
///
/// # Type Parameters
///
/// - `IO`: the board I/O implementation ([`GateDrive`])
/// - `D`: short-delay provider for the motor brake gap ([`Delay`])
///
/// # Thread Safety
///
/// The FSM itself is not thread-safe; it is meant to live on its own task.
/// Cross-task input arrives through the [`CommandQueue`] handed to `step`.
pub struct GateFsm<IO: GateDrive, D: Delay> {
    io: IO,
    delay: D,
    state: GateState,
    error_code: ErrorCode,
    lamp: bool,
    motor_opening: bool,
    motor_closing: bool,
    db_open: Debouncer,
    db_closed: Debouncer,
    limit_open: bool,
    limit_closed: bool,
    deadline_ms: u64,
    outputs_initialized: bool,
}

impl<IO: GateDrive, D: Delay> GateFsm<IO, D> {
    /// Create a new FSM in [`GateState::Initial`].
    ///
    /// No I/O happens here; the first [`step`](Self::step) de-energizes the
    /// motor, switches the lamp off, and classifies the gate position.
    pub fn new(io: IO, delay: D) -> Self {
        Self {
            io,
            delay,
            state: GateState::Initial,
            error_code: ErrorCode::Ok,
            lamp: false,
            motor_opening: false,
            motor_closing: false,
            db_open: Debouncer::new(DEBOUNCE_MS),
            db_closed: Debouncer::new(DEBOUNCE_MS),
            limit_open: false,
            limit_closed: false,
            deadline_ms: 0,
            outputs_initialized: false,
        }
    }

    /// Run one FSM cycle.
    ///
    /// Order within the cycle: sensors, emergency check, position-based
    /// transition, at most one command from `queue`. Call this every
    /// [`cycle_ms`](Self::cycle_ms) milliseconds.
    pub fn step<const N: usize>(
        &mut self,
        queue: &mut CommandQueue<N>,
        now_ms: u64,
    ) -> Result<(), IO::Error> {
        if !self.outputs_initialized {
            self.halt_motor()?;
            self.set_lamp(false)?;
            self.outputs_initialized = true;
        }

        let raw_open = self.io.limit_open()?;
        let raw_closed = self.io.limit_closed()?;
        let lsa = self.db_open.sample(raw_open, now_ms);
        let lsc = self.db_closed.sample(raw_closed, now_ms);
        self.limit_open = lsa;
        self.limit_closed = lsc;

        // An impossible sensor combination halts the motor immediately.
        if lsa && lsc && self.state != GateState::Error {
            self.error_code = ErrorCode::LimitsInconsistent;
            self.enter(GateState::Error, now_ms)?;
            return Ok(());
        }

        if let Some(next) = self.positional_transition(lsa, lsc, now_ms) {
            self.enter(next, now_ms)?;
            return Ok(());
        }

        if let Some(cmd) = queue.pop() {
            match cmd {
                GateCommand::LampOn => self.set_lamp(true)?,
                GateCommand::LampOff => self.set_lamp(false)?,
                cmd => {
                    if let Some(next) = self.command_transition(cmd, lsc) {
                        self.enter(next, now_ms)?;
                    } else {
                        log::debug!("command {} ignored in {}", cmd.as_str(), self.state.as_str());
                    }
                }
            }
        }

        Ok(())
    }

    /// Transitions driven by the limit switches and the motion deadline.
    fn positional_transition(&mut self, lsa: bool, lsc: bool, now_ms: u64) -> Option<GateState> {
        match self.state {
            GateState::Initial => Some(match (lsa, lsc) {
                (true, false) => GateState::Open,
                (false, true) => GateState::Closed,
                _ => GateState::Unknown,
            }),

            GateState::Open if lsc => Some(GateState::Closed),
            GateState::Open if !lsa => Some(GateState::Unknown),

            GateState::Closed if lsa => Some(GateState::Open),
            GateState::Closed if !lsc => Some(GateState::Unknown),

            GateState::Stopped if lsa => Some(GateState::Open),
            GateState::Stopped if lsc => Some(GateState::Closed),

            GateState::Unknown if lsa => Some(GateState::Open),
            GateState::Unknown if lsc => Some(GateState::Closed),

            GateState::Opening if lsa => Some(GateState::Open),
            // Strictly greater-than: reaching the limit exactly at the
            // deadline is a success, not a timeout.
            GateState::Opening if now_ms > self.deadline_ms => {
                self.error_code = ErrorCode::TimeoutOpen;
                Some(GateState::Error)
            }

            GateState::Closing if lsc => Some(GateState::Closed),
            GateState::Closing if now_ms > self.deadline_ms => {
                self.error_code = ErrorCode::TimeoutClose;
                Some(GateState::Error)
            }

            // In ERROR the sensors resolve the exit as soon as they are
            // consistent again; while both stay asserted the state holds
            // (and commands below still work).
            GateState::Error => match (lsa, lsc) {
                (true, false) => Some(GateState::Open),
                (false, true) => Some(GateState::Closed),
                (false, false) => Some(GateState::Unknown),
                (true, true) => None,
            },

            _ => None,
        }
    }

    /// Transitions driven by one queued command. Lamp commands never reach
    /// this point.
    fn command_transition(&self, cmd: GateCommand, lsc: bool) -> Option<GateState> {
        use GateState::*;

        match (self.state, cmd) {
            (Open, GateCommand::Close | GateCommand::Toggle) => Some(Closing),
            (Open, GateCommand::Stop) => Some(Stopped),

            (Closed, GateCommand::Open | GateCommand::Toggle) => Some(Opening),
            (Closed, GateCommand::Stop) => Some(Stopped),

            (Stopped, GateCommand::Open) => Some(Opening),
            (Stopped, GateCommand::Close) => Some(Closing),
            (Stopped, GateCommand::Toggle) => Some(if lsc { Opening } else { Closing }),

            (Unknown, GateCommand::Open | GateCommand::Toggle) => Some(Opening),
            (Unknown, GateCommand::Close) => Some(Closing),

            (Opening, GateCommand::Stop | GateCommand::Toggle) => Some(Stopped),
            (Opening, GateCommand::Close) => Some(Closing),

            (Closing, GateCommand::Stop | GateCommand::Toggle) => Some(Stopped),
            (Closing, GateCommand::Open) => Some(Opening),

            (Error, GateCommand::Open | GateCommand::Toggle) => Some(Opening),
            (Error, GateCommand::Close) => Some(Closing),

            _ => None,
        }
    }

    /// Perform the entry actions for `next` and record the transition.
    fn enter(&mut self, next: GateState, now_ms: u64) -> Result<(), IO::Error> {
        match next {
            GateState::Opening => {
                self.drive(MotorDirection::Opening)?;
                self.deadline_ms = now_ms + T_OPEN_MS;
            }
            GateState::Closing => {
                self.drive(MotorDirection::Closing)?;
                self.deadline_ms = now_ms + T_CLOSE_MS;
            }
            GateState::Error => {
                self.halt_motor()?;
                log::warn!("entering ERROR (code={})", self.error_code.code());
            }
            _ => self.halt_motor()?,
        }

        if next != self.state {
            log::info!("state {} -> {}", self.state.as_str(), next.as_str());
        }
        self.state = next;
        Ok(())
    }

    /// Energize one direction. The opposite output is released first and the
    /// new direction is only energized after the brake gap, so both outputs
    /// are never asserted at the same time.
    fn drive(&mut self, dir: MotorDirection) -> Result<(), IO::Error> {
        match dir {
            MotorDirection::Opening => {
                self.io.set_motor_close(false)?;
                self.motor_closing = false;
                self.delay.delay_ms(MOTOR_BRAKE_GAP_MS);
                self.io.set_motor_open(true)?;
                self.motor_opening = true;
            }
            MotorDirection::Closing => {
                self.io.set_motor_open(false)?;
                self.motor_opening = false;
                self.delay.delay_ms(MOTOR_BRAKE_GAP_MS);
                self.io.set_motor_close(true)?;
                self.motor_closing = true;
            }
        }
        Ok(())
    }

    fn halt_motor(&mut self) -> Result<(), IO::Error> {
        self.io.motor_stop()?;
        self.motor_opening = false;
        self.motor_closing = false;
        Ok(())
    }

    fn set_lamp(&mut self, on: bool) -> Result<(), IO::Error> {
        self.io.set_lamp(on)?;
        self.lamp = on;
        Ok(())
    }

    /// The current gate state.
    #[inline]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// The last fault code (sticky across recovery).
    #[inline]
    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    /// The cycle period appropriate for the current state: shorter while
    /// the gate is moving.
    #[inline]
    pub fn cycle_ms(&self) -> u64 {
        if self.state.is_moving() {
            CYCLE_MOVING_MS
        } else {
            CYCLE_IDLE_MS
        }
    }

    /// A copy of the externally visible state for telemetry and the portal.
    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            state: self.state,
            limit_open: self.limit_open,
            limit_closed: self.limit_closed,
            motor_opening: self.motor_opening,
            motor_closing: self.motor_closing,
            lamp: self.lamp,
            error_code: self.error_code,
        }
    }

    /// Borrow the underlying I/O (used by tests to inspect the outputs).
    pub fn io(&self) -> &IO {
        &self.io
    }

    /// Mutable access to the underlying I/O (used by tests to script the
    /// limit switches).
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }
}

#[derive(Clone, Copy)]
enum MotorDirection {
    Opening,
    Closing,
}

// ============================================================================
// Tests
// ============================================================================
