//! Persistent configuration record.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic on desktop with `std`. The record persists as individual keys
//! under one storage namespace (see [`keys`]), with atomic per-key writes.
//!
//! There are **no defaults**: a fresh device has empty credentials and an
//! empty broker URI, which keeps the broker channel dormant and forces the
//! provisioning portal on boot.
//!
//! # Example
//!
//! ```rust
//! use rs_gate::config::{GateConfig, WifiCredentials, BrokerConfig};
//!
//! let config = GateConfig::default()
//!     .with_wifi(WifiCredentials::new("HomeNet", "hunter22"))
//!     .with_broker(
//!         BrokerConfig::default()
//!             .with_uri("mqtt://192.168.1.10:1883")
//!             .with_topics("gate/cmd", "gate/status", "gate/tele"),
//!     );
//!
//! assert!(config.wifi.is_configured());
//! assert!(config.broker.is_configured());
//! ```

use crate::traits::ConfigStore;
use heapless::String as HString;

/// Maximum SSID length in bytes.
pub const MAX_SSID_LEN: usize = 32;
/// Maximum Wi-Fi password length in bytes.
pub const MAX_PASS_LEN: usize = 64;
/// Maximum broker URI length in bytes (scheme included).
pub const MAX_URI_LEN: usize = 128;
/// Maximum topic name length in bytes.
pub const MAX_TOPIC_LEN: usize = 96;

/// SSID storage type.
pub type SsidString = HString<MAX_SSID_LEN>;
/// Wi-Fi password storage type.
pub type PassString = HString<MAX_PASS_LEN>;
/// Broker URI storage type.
pub type UriString = HString<MAX_URI_LEN>;
/// Topic name storage type.
pub type TopicString = HString<MAX_TOPIC_LEN>;

/// Storage namespace and key names.
///
/// These names are part of the device's flash layout and must not change
/// across firmware versions.
pub mod keys {
    /// Namespace all keys live under.
    pub const NAMESPACE: &str = "config";
    /// Wi-Fi SSID (string).
    pub const WIFI_SSID: &str = "wifi_ssid";
    /// Wi-Fi password (string, may be empty for open networks).
    pub const WIFI_PASS: &str = "wifi_pass";
    /// Boot mode (byte, see [`crate::config::BootMode`]).
    pub const BOOT_MODE: &str = "boot_mode";
    /// Broker URI (string).
    pub const MQTT_URI: &str = "mqtt_uri";
    /// Command topic, subscribed (string).
    pub const TOPIC_CMD: &str = "topic1";
    /// Status topic, published (string).
    pub const TOPIC_STATUS: &str = "topic2";
    /// Telemetry topic, published (string).
    pub const TOPIC_TELE: &str = "topic3";
}

/// Create a bounded string from a `&str`, truncating at a char boundary if
/// too long.
pub fn bounded<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    let take = s.len().min(N);
    let valid_end = s
        .char_indices()
        .take_while(|(i, _)| *i < take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Boot Mode
// ============================================================================

/// How the connectivity layer should come up on the next boot.
///
/// Persisted as a single byte. Anything other than the operational marker
/// (including an absent key) reads back as [`Provisioning`](Self::Provisioning),
/// so a corrupted or fresh flash always lands on the configuration portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BootMode {
    /// Bring up the configuration access point alongside the station.
    #[default]
    Provisioning,
    /// Station-only operation with stored credentials.
    Operational,
}

impl BootMode {
    /// Byte representation used in persistent storage.
    pub const fn as_u8(self) -> u8 {
        match self {
            BootMode::Provisioning => 0,
            BootMode::Operational => 1,
        }
    }

    /// Decode from storage; unknown values map to provisioning.
    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => BootMode::Operational,
            _ => BootMode::Provisioning,
        }
    }
}

// ============================================================================
// Wi-Fi Credentials
// ============================================================================

/// Station credentials.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiCredentials {
    /// Network SSID. Empty means "not provisioned".
    pub ssid: SsidString,
    /// Network password. Empty means an open network.
    pub password: PassString,
}

impl WifiCredentials {
    /// Create credentials from string slices, truncating to the field limits.
    pub fn new(ssid: &str, password: &str) -> Self {
        Self {
            ssid: bounded(ssid),
            password: bounded(password),
        }
    }

    /// Check if a station connection can be attempted.
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Broker Config
// ============================================================================

/// Broker URI and the three topic names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrokerConfig {
    /// Broker URI with scheme, e.g. `mqtt://host:1883`. Empty means the
    /// broker channel stays dormant.
    pub uri: UriString,
    /// Command topic (subscribed).
    pub topic_cmd: TopicString,
    /// Status topic (published on change).
    pub topic_status: TopicString,
    /// Telemetry topic (published periodically).
    pub topic_tele: TopicString,
}

impl BrokerConfig {
    /// Set the broker URI.
    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = bounded(uri);
        self
    }

    /// Set all three topic names.
    pub fn with_topics(mut self, cmd: &str, status: &str, tele: &str) -> Self {
        self.topic_cmd = bounded(cmd);
        self.topic_status = bounded(status);
        self.topic_tele = bounded(tele);
        self
    }

    /// Check if the broker channel should be started.
    pub fn is_configured(&self) -> bool {
        !self.uri.is_empty()
    }
}

// ============================================================================
// Gate Config
// ============================================================================

/// The complete persistent configuration record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateConfig {
    /// Station credentials.
    pub wifi: WifiCredentials,
    /// Broker URI and topics.
    pub broker: BrokerConfig,
    /// Boot mode for the next start.
    pub boot_mode: BootMode,
}

impl GateConfig {
    /// Set the Wi-Fi credentials.
    pub fn with_wifi(mut self, wifi: WifiCredentials) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set the broker configuration.
    pub fn with_broker(mut self, broker: BrokerConfig) -> Self {
        self.broker = broker;
        self
    }

    /// Set the boot mode.
    pub fn with_boot_mode(mut self, mode: BootMode) -> Self {
        self.boot_mode = mode;
        self
    }

    /// Load the record from persistent storage.
    ///
    /// Missing keys read back as empty fields; a missing boot mode reads
    /// back as provisioning.
    pub fn load<S: ConfigStore>(store: &S) -> Result<Self, S::Error> {
        let get = |key: &str| -> Result<alloc::string::String, S::Error> {
            Ok(store.get_str(key)?.unwrap_or_default())
        };

        Ok(Self {
            wifi: WifiCredentials {
                ssid: bounded(&get(keys::WIFI_SSID)?),
                password: bounded(&get(keys::WIFI_PASS)?),
            },
            broker: BrokerConfig {
                uri: bounded(&get(keys::MQTT_URI)?),
                topic_cmd: bounded(&get(keys::TOPIC_CMD)?),
                topic_status: bounded(&get(keys::TOPIC_STATUS)?),
                topic_tele: bounded(&get(keys::TOPIC_TELE)?),
            },
            boot_mode: store
                .get_u8(keys::BOOT_MODE)?
                .map(BootMode::from_u8)
                .unwrap_or_default(),
        })
    }

    /// Persist the Wi-Fi credentials.
    pub fn save_wifi<S: ConfigStore>(&self, store: &mut S) -> Result<(), S::Error> {
        store.set_str(keys::WIFI_SSID, &self.wifi.ssid)?;
        store.set_str(keys::WIFI_PASS, &self.wifi.password)?;
        log::info!("wifi credentials saved");
        Ok(())
    }

    /// Persist the broker URI and topics.
    pub fn save_broker<S: ConfigStore>(&self, store: &mut S) -> Result<(), S::Error> {
        store.set_str(keys::MQTT_URI, &self.broker.uri)?;
        store.set_str(keys::TOPIC_CMD, &self.broker.topic_cmd)?;
        store.set_str(keys::TOPIC_STATUS, &self.broker.topic_status)?;
        store.set_str(keys::TOPIC_TELE, &self.broker.topic_tele)?;
        log::info!("broker uri and topics saved");
        Ok(())
    }

    /// Persist the boot mode and update the in-memory record.
    pub fn save_boot_mode<S: ConfigStore>(
        &mut self,
        store: &mut S,
        mode: BootMode,
    ) -> Result<(), S::Error> {
        store.set_u8(keys::BOOT_MODE, mode.as_u8())?;
        self.boot_mode = mode;
        log::info!("boot mode -> {:?}", mode);
        Ok(())
    }

    /// Erase all credentials and broker configuration, force provisioning
    /// on the next boot, and clear the in-memory record.
    pub fn wipe<S: ConfigStore>(&mut self, store: &mut S) -> Result<(), S::Error> {
        store.erase(keys::WIFI_SSID)?;
        store.erase(keys::WIFI_PASS)?;
        store.erase(keys::MQTT_URI)?;
        store.erase(keys::TOPIC_CMD)?;
        store.erase(keys::TOPIC_STATUS)?;
        store.erase(keys::TOPIC_TELE)?;
        store.set_u8(keys::BOOT_MODE, BootMode::Provisioning.as_u8())?;
        *self = GateConfig::default();
        log::warn!("wifi/broker credentials wiped");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MemStore;

    #[test]
    fn default_record_is_unprovisioned() {
        let config = GateConfig::default();
        assert!(!config.wifi.is_configured());
        assert!(!config.broker.is_configured());
        assert_eq!(config.boot_mode, BootMode::Provisioning);
    }

    #[test]
    fn boot_mode_round_trip() {
        assert_eq!(BootMode::from_u8(BootMode::Provisioning.as_u8()), BootMode::Provisioning);
        assert_eq!(BootMode::from_u8(BootMode::Operational.as_u8()), BootMode::Operational);
    }

    #[test]
    fn boot_mode_unknown_byte_maps_to_provisioning() {
        assert_eq!(BootMode::from_u8(7), BootMode::Provisioning);
        assert_eq!(BootMode::from_u8(255), BootMode::Provisioning);
    }

    #[test]
    fn wifi_is_configured_requires_ssid() {
        assert!(!WifiCredentials::new("", "pass").is_configured());
        assert!(WifiCredentials::new("net", "").is_configured());
    }

    #[test]
    fn bounded_truncates_long_input() {
        let long = "a".repeat(100);
        let s: SsidString = bounded(&long);
        assert_eq!(s.len(), MAX_SSID_LEN);
    }

    #[test]
    fn bounded_respects_utf8_boundaries() {
        let input = "ñ".repeat(40); // 2 bytes each
        let s: SsidString = bounded(&input);
        assert!(s.len() <= MAX_SSID_LEN);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = GateConfig::default()
            .with_wifi(WifiCredentials::new("net", "secret"))
            .with_broker(
                BrokerConfig::default()
                    .with_uri("mqtt://broker.local:1883")
                    .with_topics("g/cmd", "g/status", "g/tele"),
            )
            .with_boot_mode(BootMode::Operational);

        assert_eq!(config.wifi.ssid.as_str(), "net");
        assert_eq!(config.broker.uri.as_str(), "mqtt://broker.local:1883");
        assert_eq!(config.broker.topic_status.as_str(), "g/status");
        assert_eq!(config.boot_mode, BootMode::Operational);
    }

    #[test]
    fn load_from_empty_store_yields_default() {
        let store = MemStore::new();
        let config = GateConfig::load(&store).unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = MemStore::new();
        let mut config = GateConfig::default()
            .with_wifi(WifiCredentials::new("HomeNet", "hunter22"))
            .with_broker(
                BrokerConfig::default()
                    .with_uri("mqtt://192.168.1.10:1883")
                    .with_topics("gate/cmd", "gate/status", "gate/tele"),
            );

        config.save_wifi(&mut store).unwrap();
        config.save_broker(&mut store).unwrap();
        config
            .save_boot_mode(&mut store, BootMode::Operational)
            .unwrap();

        let loaded = GateConfig::load(&store).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn wipe_erases_everything_and_forces_provisioning() {
        let mut store = MemStore::new();
        let mut config = GateConfig::default()
            .with_wifi(WifiCredentials::new("HomeNet", "hunter22"))
            .with_broker(BrokerConfig::default().with_uri("mqtt://b:1883"));
        config.save_wifi(&mut store).unwrap();
        config.save_broker(&mut store).unwrap();
        config
            .save_boot_mode(&mut store, BootMode::Operational)
            .unwrap();

        config.wipe(&mut store).unwrap();

        assert_eq!(config, GateConfig::default());
        let reloaded = GateConfig::load(&store).unwrap();
        assert!(!reloaded.wifi.is_configured());
        assert!(!reloaded.broker.is_configured());
        assert_eq!(reloaded.boot_mode, BootMode::Provisioning);
    }
}
