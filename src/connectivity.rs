//! Boot-mode resolution and the connect watchdog.
//!
//! The Wi-Fi lifecycle has exactly two shapes:
//!
//! - **Provisioning**: the configuration access point runs alongside the
//!   station so the portal is reachable even while a connection attempt is
//!   in flight.
//! - **Operational**: station only.
//!
//! The stored boot mode *requests* a shape, but missing credentials always
//! force provisioning ([`resolve_start_mode`]). A station connection attempt
//! is bounded by [`ConnectWatchdog`]: if no IP arrives within 30 seconds the
//! supervisor flips the boot mode back to provisioning and restarts, so a
//! mistyped password can always be corrected at the portal without physical
//! access.
//!
//! Reconnects after a drop are a different story: while credentials exist
//! they retry forever and the watchdog is *not* re-armed.

use crate::config::GateConfig;

/// SSID of the configuration access point.
pub const AP_SSID: &str = "ESP_CONFIG_AP";
/// Password of the configuration access point.
pub const AP_PASSWORD: &str = "12345678";
/// Wi-Fi channel of the configuration access point.
pub const AP_CHANNEL: u8 = 1;
/// Station limit of the configuration access point.
pub const AP_MAX_CLIENTS: u8 = 4;
/// Horizon of one bounded station connect attempt.
pub const CONNECT_TIMEOUT_MS: u64 = 30_000;
/// Poll period of the watchdog task.
pub const WATCHDOG_POLL_MS: u64 = 500;

/// The resolved Wi-Fi shape for this boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    /// Access point + station.
    Provisioning,
    /// Station only.
    Operational,
}

/// Resolve the starting mode from the stored record.
///
/// Absent or empty credentials force provisioning regardless of the stored
/// boot mode.
///
/// # Example
///
/// ```rust
/// use rs_gate::{resolve_start_mode, BootMode, GateConfig, StartMode, WifiCredentials};
///
/// let fresh = GateConfig::default();
/// assert_eq!(resolve_start_mode(&fresh), StartMode::Provisioning);
///
/// let provisioned = GateConfig::default()
///     .with_wifi(WifiCredentials::new("net", "pw"))
///     .with_boot_mode(BootMode::Operational);
/// assert_eq!(resolve_start_mode(&provisioned), StartMode::Operational);
/// ```
pub fn resolve_start_mode(config: &GateConfig) -> StartMode {
    if config.boot_mode == crate::config::BootMode::Provisioning || !config.wifi.is_configured() {
        StartMode::Provisioning
    } else {
        StartMode::Operational
    }
}

/// Bounded connect attempt tracker.
///
/// Armed when a station connection is initiated, disarmed when an IP is
/// acquired. [`expired`](Self::expired) uses a strict greater-than so the
/// horizon itself is still inside the attempt.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectWatchdog {
    deadline_ms: Option<u64>,
}

impl ConnectWatchdog {
    /// Create a disarmed watchdog.
    pub const fn new() -> Self {
        Self { deadline_ms: None }
    }

    /// Arm (or re-arm) the watchdog for one attempt starting at `now_ms`.
    pub fn arm(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms + CONNECT_TIMEOUT_MS);
    }

    /// Disarm after a successful connection.
    pub fn disarm(&mut self) {
        self.deadline_ms = None;
    }

    /// True while an attempt is being supervised.
    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// True once the supervised attempt has outlived its horizon.
    pub fn expired(&self, now_ms: u64) -> bool {
        matches!(self.deadline_ms, Some(deadline) if now_ms > deadline)
    }
}
