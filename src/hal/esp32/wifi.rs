//! The connectivity supervisor: Wi-Fi lifecycle on ESP32.
//!
//! Boots either in provisioning shape (configuration access point alongside
//! the station) or station-only, per [`resolve_start_mode`]. A station
//! connect attempt is supervised by the 30-second [`ConnectWatchdog`]; on
//! expiry the boot mode is flipped back to provisioning and the device
//! restarts into the portal.
//!
//! Driver-level Wi-Fi configuration is held in RAM only - the NVS
//! configuration record is the sole persistent source of truth.

use std::string::{String, ToString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent,
};

use super::{Esp32Clock, NvsStore};
use crate::config::{keys, BootMode, GateConfig, WifiCredentials};
use crate::connectivity::{
    resolve_start_mode, ConnectWatchdog, StartMode, AP_CHANNEL, AP_MAX_CLIENTS, AP_PASSWORD,
    AP_SSID, WATCHDOG_POLL_MS,
};
use crate::traits::{Clock, ConfigStore};

struct SupervisorShared {
    connected: AtomicBool,
    ap_active: AtomicBool,
    have_creds: AtomicBool,
    sta_ip: Mutex<String>,
    watchdog: Mutex<ConnectWatchdog>,
}

/// Owns the Wi-Fi driver and its recovery policy.
///
/// All methods take `&self`; the supervisor is wrapped in an `Arc` and
/// shared with the portal handlers, which call
/// [`apply_station`](Self::apply_station) on a Wi-Fi form submission.
pub struct WifiSupervisor {
    wifi: Arc<Mutex<EspWifi<'static>>>,
    shared: Arc<SupervisorShared>,
    _subscriptions: Vec<EspSubscription<'static, System>>,
}

impl WifiSupervisor {
    /// Bring up Wi-Fi in the shape resolved from the configuration record
    /// and start supervising.
    ///
    /// With credentials present a connect attempt is initiated immediately
    /// and the watchdog is armed. The watchdog task is spawned here and
    /// polls every 500 ms for the lifetime of the process.
    pub fn start(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        store: Arc<Mutex<NvsStore>>,
        config: &GateConfig,
    ) -> Result<Self> {
        let mode = resolve_start_mode(config);
        let creds = config.wifi.clone();

        let mut wifi = EspWifi::new(modem, sysloop.clone(), None)?;
        wifi.set_configuration(&Self::configuration(mode, &creds))?;
        wifi.start()?;

        let shared = Arc::new(SupervisorShared {
            connected: AtomicBool::new(false),
            ap_active: AtomicBool::new(mode == StartMode::Provisioning),
            have_creds: AtomicBool::new(creds.is_configured()),
            sta_ip: Mutex::new("0.0.0.0".to_string()),
            watchdog: Mutex::new(ConnectWatchdog::new()),
        });
        let wifi = Arc::new(Mutex::new(wifi));
        let clock = Esp32Clock::new();

        if creds.is_configured() {
            log::info!("connecting to '{}'", creds.ssid);
            wifi.lock().unwrap().connect()?;
            shared.watchdog.lock().unwrap().arm(clock.now_ms());
        } else {
            log::info!(
                "no credentials; portal AP '{}' at http://192.168.4.1/",
                AP_SSID
            );
        }

        let mut subscriptions = Vec::new();

        // Reconnect forever on drops while credentials exist. The watchdog
        // is deliberately not re-armed here: only fresh attempts (boot,
        // portal submission) are bounded.
        {
            let wifi = Arc::clone(&wifi);
            let shared = Arc::clone(&shared);
            subscriptions.push(sysloop.subscribe::<WifiEvent, _>(move |event| {
                if let WifiEvent::StaDisconnected(_) = event {
                    shared.connected.store(false, Ordering::Relaxed);
                    if shared.have_creds.load(Ordering::Relaxed) {
                        log::warn!("station disconnected, retrying");
                        if let Ok(mut wifi) = wifi.try_lock() {
                            let _ = wifi.connect();
                        }
                    }
                }
            })?);
        }

        // IP acquisition ends the supervised attempt: persist operational
        // mode and drop the configuration AP if it is still up.
        {
            let wifi = Arc::clone(&wifi);
            let shared = Arc::clone(&shared);
            let store = Arc::clone(&store);
            let creds = creds.clone();
            subscriptions.push(sysloop.subscribe::<IpEvent, _>(move |event| {
                if let IpEvent::DhcpIpAssigned(assignment) = event {
                    let ip = assignment.ip().to_string();
                    log::info!("got IP {}", ip);
                    *shared.sta_ip.lock().unwrap() = ip;
                    shared.connected.store(true, Ordering::Relaxed);
                    shared.watchdog.lock().unwrap().disarm();

                    if let Ok(mut store) = store.lock() {
                        let _ = store.set_u8(keys::BOOT_MODE, BootMode::Operational.as_u8());
                    }

                    if shared.ap_active.swap(false, Ordering::Relaxed) {
                        log::info!("station up, tearing down configuration AP");
                        if let Ok(mut wifi) = wifi.try_lock() {
                            let _ = wifi.set_configuration(&Self::configuration(
                                StartMode::Operational,
                                &creds,
                            ));
                        }
                    }
                }
            })?);
        }

        let supervisor = Self {
            wifi,
            shared,
            _subscriptions: subscriptions,
        };
        supervisor.spawn_watchdog(store);
        Ok(supervisor)
    }

    /// Driver configuration for a start mode.
    fn configuration(mode: StartMode, creds: &WifiCredentials) -> Configuration {
        let client = ClientConfiguration {
            ssid: creds.ssid.clone(),
            password: creds.password.clone(),
            auth_method: if creds.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };

        match mode {
            StartMode::Operational => Configuration::Client(client),
            StartMode::Provisioning => Configuration::Mixed(
                client,
                AccessPointConfiguration {
                    ssid: crate::config::bounded(AP_SSID),
                    password: crate::config::bounded(AP_PASSWORD),
                    channel: AP_CHANNEL,
                    max_connections: AP_MAX_CLIENTS as u16,
                    auth_method: if AP_PASSWORD.is_empty() {
                        AuthMethod::None
                    } else {
                        AuthMethod::WPAWPA2Personal
                    },
                    ..Default::default()
                },
            ),
        }
    }

    /// Apply new station credentials from the portal.
    ///
    /// Keeps the configuration AP up (the boot mode stays provisioning until
    /// an IP is actually acquired), reconnects, and arms the watchdog so a
    /// bad password falls back to the portal after 30 s.
    pub fn apply_station(&self, creds: &WifiCredentials) -> Result<()> {
        let mode = if self.shared.ap_active.load(Ordering::Relaxed) {
            StartMode::Provisioning
        } else {
            StartMode::Operational
        };

        {
            let mut wifi = self.wifi.lock().unwrap();
            wifi.set_configuration(&Self::configuration(mode, creds))?;
            let _ = wifi.disconnect();
            wifi.connect()?;
        }

        self.shared.have_creds.store(true, Ordering::Relaxed);
        self.shared
            .watchdog
            .lock()
            .unwrap()
            .arm(Esp32Clock::new().now_ms());
        log::info!("station reconfigured for '{}'", creds.ssid);
        Ok(())
    }

    /// True while the station holds an IP.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }

    /// The station IP as text, `0.0.0.0` while disconnected.
    pub fn sta_ip(&self) -> String {
        self.shared.sta_ip.lock().unwrap().clone()
    }

    /// Low-rate poll task: a supervised attempt that outlives its horizon
    /// schedules re-provisioning and restarts the device.
    fn spawn_watchdog(&self, store: Arc<Mutex<NvsStore>>) {
        let shared = Arc::clone(&self.shared);
        let clock = Esp32Clock::new();

        thread::spawn(move || loop {
            let expired = {
                let watchdog = shared.watchdog.lock().unwrap();
                !shared.connected.load(Ordering::Relaxed) && watchdog.expired(clock.now_ms())
            };

            if expired {
                log::warn!("no IP within 30 s; rebooting into provisioning");
                if let Ok(mut store) = store.lock() {
                    let _ = store.set_u8(keys::BOOT_MODE, BootMode::Provisioning.as_u8());
                }
                thread::sleep(Duration::from_millis(200));
                esp_idf_hal::reset::restart();
            }

            thread::sleep(Duration::from_millis(WATCHDOG_POLL_MS));
        });
    }
}
