//! Command alphabet and the bounded command queue.
//!
//! Commands arrive from the broker channel (and nowhere else), are decoded
//! into [`GateCommand`] values, and travel to the FSM through a bounded FIFO
//! [`CommandQueue`]. The queue is the only structured channel between the
//! broker event thread and the FSM task.
//!
//! # Queue Policy
//!
//! - Capacity 16, plain FIFO order
//! - Non-blocking push: when full, the **new** command is dropped (the FSM
//!   consumes at most one command per cycle, so a full queue means the
//!   operator is far ahead of the gate anyway)
//! - Non-blocking pop
//!
//! # Example
//!
//! ```rust
//! use rs_gate::{CommandQueue, GateCommand};
//!
//! let mut queue: CommandQueue<4> = CommandQueue::new();
//! assert!(queue.push(GateCommand::Open));
//! assert!(queue.push(GateCommand::Stop));
//!
//! // FIFO order
//! assert_eq!(queue.pop(), Some(GateCommand::Open));
//! assert_eq!(queue.pop(), Some(GateCommand::Stop));
//! assert_eq!(queue.pop(), None);
//! ```

use heapless::Deque;

/// Capacity of the gate command queue.
pub const COMMAND_QUEUE_DEPTH: usize = 16;

/// A remote gate command.
///
/// The wire names are matched case-insensitively; see
/// [`GateCommand::from_name`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum GateCommand {
    /// Drive the gate toward the fully-open position.
    Open,
    /// Drive the gate toward the fully-closed position.
    Close,
    /// Halt an in-progress motion.
    Stop,
    /// Context-dependent: opens a closed gate, closes an open one, halts a
    /// moving one.
    Toggle,
    /// Switch the warning lamp on. Accepted in every state; does not affect
    /// the gate state or motion deadlines.
    LampOn,
    /// Switch the warning lamp off.
    LampOff,
}

impl GateCommand {
    /// Parse a command from its wire name, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_gate::GateCommand;
    ///
    /// assert_eq!(GateCommand::from_name("OPEN"), Some(GateCommand::Open));
    /// assert_eq!(GateCommand::from_name("open"), Some(GateCommand::Open));
    /// assert_eq!(GateCommand::from_name("Lamp_On"), Some(GateCommand::LampOn));
    /// assert_eq!(GateCommand::from_name("JUMP"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        const NAMES: [(&str, GateCommand); 6] = [
            ("OPEN", GateCommand::Open),
            ("CLOSE", GateCommand::Close),
            ("STOP", GateCommand::Stop),
            ("TOGGLE", GateCommand::Toggle),
            ("LAMP_ON", GateCommand::LampOn),
            ("LAMP_OFF", GateCommand::LampOff),
        ];
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, c)| *c)
    }

    /// Returns the canonical wire name.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GateCommand::Open => "OPEN",
            GateCommand::Close => "CLOSE",
            GateCommand::Stop => "STOP",
            GateCommand::Toggle => "TOGGLE",
            GateCommand::LampOn => "LAMP_ON",
            GateCommand::LampOff => "LAMP_OFF",
        }
    }

    /// Returns true for the lamp commands, which never cause a state
    /// transition.
    #[inline]
    pub const fn is_lamp(&self) -> bool {
        matches!(self, GateCommand::LampOn | GateCommand::LampOff)
    }
}

/// Bounded FIFO queue of gate commands.
///
/// # Capacity
///
/// The queue has a fixed capacity `N` (const generic); the firmware uses
/// [`COMMAND_QUEUE_DEPTH`]. When full, new commands are dropped and `push`
/// returns `false` - existing entries are never displaced.
pub struct CommandQueue<const N: usize> {
    buf: Deque<GateCommand, N>,
}

impl<const N: usize> CommandQueue<N> {
    /// Creates a new empty command queue with capacity N.
    pub fn new() -> Self {
        Self { buf: Deque::new() }
    }

    /// Push a command onto the back of the queue.
    ///
    /// Returns `false` (and drops the command) if the queue is full.
    #[must_use]
    pub fn push(&mut self, cmd: GateCommand) -> bool {
        self.buf.push_back(cmd).is_ok()
    }

    /// Pop the oldest command, if any. Never blocks.
    pub fn pop(&mut self) -> Option<GateCommand> {
        self.buf.pop_front()
    }

    /// Returns the number of queued commands.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns true if the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.buf.is_full()
    }

    /// Discard all queued commands.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // === GateCommand Tests ===

    #[test]
    fn from_name_canonical() {
        assert_eq!(GateCommand::from_name("OPEN"), Some(GateCommand::Open));
        assert_eq!(GateCommand::from_name("CLOSE"), Some(GateCommand::Close));
        assert_eq!(GateCommand::from_name("STOP"), Some(GateCommand::Stop));
        assert_eq!(GateCommand::from_name("TOGGLE"), Some(GateCommand::Toggle));
        assert_eq!(GateCommand::from_name("LAMP_ON"), Some(GateCommand::LampOn));
        assert_eq!(
            GateCommand::from_name("LAMP_OFF"),
            Some(GateCommand::LampOff)
        );
    }

    #[test]
    fn from_name_case_insensitive() {
        assert_eq!(GateCommand::from_name("open"), Some(GateCommand::Open));
        assert_eq!(GateCommand::from_name("Close"), Some(GateCommand::Close));
        assert_eq!(
            GateCommand::from_name("lamp_off"),
            Some(GateCommand::LampOff)
        );
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert_eq!(GateCommand::from_name(""), None);
        assert_eq!(GateCommand::from_name("HALT"), None);
        assert_eq!(GateCommand::from_name("OPEN "), None);
        assert_eq!(GateCommand::from_name("LAMP ON"), None);
    }

    #[test]
    fn as_str_round_trips() {
        for cmd in [
            GateCommand::Open,
            GateCommand::Close,
            GateCommand::Stop,
            GateCommand::Toggle,
            GateCommand::LampOn,
            GateCommand::LampOff,
        ] {
            assert_eq!(GateCommand::from_name(cmd.as_str()), Some(cmd));
        }
    }

    #[test]
    fn is_lamp_only_for_lamp_commands() {
        assert!(GateCommand::LampOn.is_lamp());
        assert!(GateCommand::LampOff.is_lamp());
        assert!(!GateCommand::Open.is_lamp());
        assert!(!GateCommand::Toggle.is_lamp());
    }

    // === CommandQueue Tests ===

    #[test]
    fn queue_new_is_empty() {
        let q: CommandQueue<4> = CommandQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn queue_push_and_pop_fifo() {
        let mut q: CommandQueue<4> = CommandQueue::new();
        assert!(q.push(GateCommand::Open));
        assert!(q.push(GateCommand::Stop));
        assert!(q.push(GateCommand::Close));

        assert_eq!(q.pop(), Some(GateCommand::Open));
        assert_eq!(q.pop(), Some(GateCommand::Stop));
        assert_eq!(q.pop(), Some(GateCommand::Close));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn queue_full_drops_newest() {
        let mut q: CommandQueue<2> = CommandQueue::new();
        assert!(q.push(GateCommand::Open));
        assert!(q.push(GateCommand::Close));
        assert!(q.is_full());

        // New arrival is dropped, existing order preserved
        assert!(!q.push(GateCommand::Stop));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some(GateCommand::Open));
        assert_eq!(q.pop(), Some(GateCommand::Close));
    }

    #[test]
    fn queue_overflow_at_firmware_depth() {
        let mut q: CommandQueue<COMMAND_QUEUE_DEPTH> = CommandQueue::new();
        for _ in 0..COMMAND_QUEUE_DEPTH {
            assert!(q.push(GateCommand::Toggle));
        }
        assert!(!q.push(GateCommand::Open));
        assert_eq!(q.len(), COMMAND_QUEUE_DEPTH);
    }

    #[test]
    fn queue_clear_removes_all() {
        let mut q: CommandQueue<4> = CommandQueue::new();
        let _ = q.push(GateCommand::Open);
        let _ = q.push(GateCommand::Close);

        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn queue_default_is_empty() {
        let q: CommandQueue<4> = CommandQueue::default();
        assert!(q.is_empty());
    }
}
