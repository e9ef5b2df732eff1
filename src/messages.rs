//! Typed inbound command payloads.
//!
//! Commands arrive on the command topic as a small JSON object:
//!
//! ```json
//! {"cmd": "OPEN"}
//! ```
//!
//! The `cmd` value is matched case-insensitively against the command
//! alphabet. Anything else - malformed JSON, a missing or oversized `cmd`
//! field, an unknown name - decodes to `None` and is dropped by the caller
//! with a log line. Repeated delivery of the same command is harmless: the
//! FSM's transition table is idempotent with respect to its current state.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "serde-json-core")] {
//! use rs_gate::{messages::parse_command, GateCommand};
//!
//! assert_eq!(parse_command(br#"{"cmd":"OPEN"}"#), Some(GateCommand::Open));
//! assert_eq!(parse_command(br#"{"cmd":"toggle"}"#), Some(GateCommand::Toggle));
//! assert_eq!(parse_command(b"OPEN"), None); // not a JSON object
//! # }
//! ```

use crate::commands::GateCommand;
use serde::{Deserialize, Serialize};

/// Longest accepted `cmd` value. The longest real command is `LAMP_OFF`;
/// anything past this bound is certainly not in the alphabet.
pub const MAX_CMD_LEN: usize = 16;

/// The inbound command envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Command name, matched case-insensitively.
    pub cmd: heapless::String<MAX_CMD_LEN>,
}

/// Decode one command payload.
///
/// Returns `None` on any parse failure or unrecognized command name.
#[cfg(feature = "serde-json-core")]
pub fn parse_command(payload: &[u8]) -> Option<GateCommand> {
    let (request, _rest) = serde_json_core::from_slice::<CommandRequest>(payload).ok()?;
    GateCommand::from_name(&request.cmd)
}
