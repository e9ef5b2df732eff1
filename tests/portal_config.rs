//! Provisioning flows: portal submissions against the configuration record,
//! and the connect-watchdog recovery path.

use rs_gate::hal::MemStore;
use rs_gate::portal::{apply_request, parse_request, render_wipe_page, PortalRequest};
use rs_gate::{
    resolve_start_mode, BootMode, ConnectWatchdog, GateConfig, StartMode, WifiCredentials,
    CONNECT_TIMEOUT_MS,
};

/// A provisioned device: credentials and broker stored, operational mode.
fn provisioned(store: &mut MemStore) -> GateConfig {
    let mut config = GateConfig::default()
        .with_wifi(WifiCredentials::new("HomeNet", "hunter22"))
        .with_broker(
            rs_gate::BrokerConfig::default()
                .with_uri("mqtt://192.168.1.10:1883")
                .with_topics("gate/cmd", "gate/status", "gate/tele"),
        );
    config.save_wifi(store).unwrap();
    config.save_broker(store).unwrap();
    config
        .save_boot_mode(store, BootMode::Operational)
        .unwrap();
    config
}

// ============================================================================
// Wi-Fi form flow
// ============================================================================

#[test]
fn wifi_submission_persists_and_keeps_provisioning_mode() {
    let mut store = MemStore::new();

    // Portal POST body as the browser sends it.
    let request = parse_request("act=wifi&ssid=My+Home+Net&pass=p%40ssw0rd").unwrap();
    let mut config = GateConfig::load(&store).unwrap();
    apply_request(&request, &mut config);
    config.save_wifi(&mut store).unwrap();
    // A fresh attempt stays provisioning until an IP confirms it.
    config
        .save_boot_mode(&mut store, BootMode::Provisioning)
        .unwrap();

    let reloaded = GateConfig::load(&store).unwrap();
    assert_eq!(reloaded.wifi.ssid.as_str(), "My Home Net");
    assert_eq!(reloaded.wifi.password.as_str(), "p@ssw0rd");
    assert_eq!(resolve_start_mode(&reloaded), StartMode::Provisioning);
}

#[test]
fn got_ip_flips_to_operational() {
    let mut store = MemStore::new();
    let mut config = GateConfig::default().with_wifi(WifiCredentials::new("net", "pw"));
    config.save_wifi(&mut store).unwrap();

    // What the supervisor does on STA_GOT_IP.
    config
        .save_boot_mode(&mut store, BootMode::Operational)
        .unwrap();

    let reloaded = GateConfig::load(&store).unwrap();
    assert_eq!(resolve_start_mode(&reloaded), StartMode::Operational);
}

// ============================================================================
// Broker form flow
// ============================================================================

#[test]
fn broker_submission_overwrites_only_filled_fields() {
    let mut store = MemStore::new();
    let mut config = provisioned(&mut store);

    // Operator only changes the command topic; everything else left blank.
    let request = parse_request("act=mqtt&broker=&t1=porton%2Fcmd&t2=&t3=").unwrap();
    apply_request(&request, &mut config);
    config.save_broker(&mut store).unwrap();

    let reloaded = GateConfig::load(&store).unwrap();
    assert_eq!(reloaded.broker.uri.as_str(), "mqtt://192.168.1.10:1883");
    assert_eq!(reloaded.broker.topic_cmd.as_str(), "porton/cmd");
    assert_eq!(reloaded.broker.topic_status.as_str(), "gate/status");
    assert_eq!(reloaded.broker.topic_tele.as_str(), "gate/tele");
}

#[test]
fn untouched_broker_form_is_still_a_valid_submission() {
    // The empty submission restarts the channel; the record is unchanged.
    let request = parse_request("act=mqtt&broker=&t1=&t2=&t3=").unwrap();
    assert_eq!(
        request,
        PortalRequest::SaveBroker {
            uri: None,
            topic_cmd: None,
            topic_status: None,
            topic_tele: None,
        }
    );

    let mut store = MemStore::new();
    let mut config = provisioned(&mut store);
    let before = config.clone();
    apply_request(&request, &mut config);
    assert_eq!(config, before);
}

// ============================================================================
// Scenario 5: provisioning recovery after a connect stall
// ============================================================================

#[test]
fn connect_stall_forces_reprovisioning_on_next_boot() {
    let mut store = MemStore::new();
    let mut config = provisioned(&mut store);
    assert_eq!(resolve_start_mode(&config), StartMode::Operational);

    // Boot: the supervisor arms the watchdog when the attempt starts.
    let mut watchdog = ConnectWatchdog::new();
    watchdog.arm(1_000);

    // The network is unreachable; no IP ever arrives.
    assert!(!watchdog.expired(1_000 + CONNECT_TIMEOUT_MS));
    assert!(watchdog.expired(1_000 + CONNECT_TIMEOUT_MS + 1));

    // Watchdog action: flip the boot mode and restart.
    config
        .save_boot_mode(&mut store, BootMode::Provisioning)
        .unwrap();

    // Next boot lands on the portal even though credentials still exist.
    let rebooted = GateConfig::load(&store).unwrap();
    assert!(rebooted.wifi.is_configured());
    assert_eq!(resolve_start_mode(&rebooted), StartMode::Provisioning);
}

#[test]
fn successful_connection_disarms_the_watchdog() {
    let mut watchdog = ConnectWatchdog::new();
    watchdog.arm(0);

    // STA_GOT_IP before the horizon.
    watchdog.disarm();
    assert!(!watchdog.expired(CONNECT_TIMEOUT_MS + 1));

    // A later disconnect retries without re-arming: no forced reboot even
    // if the retry takes minutes.
    assert!(!watchdog.expired(10 * CONNECT_TIMEOUT_MS));
}

// ============================================================================
// Scenario 6: wipe
// ============================================================================

#[test]
fn wipe_erases_store_and_reboots_into_the_ap() {
    let mut store = MemStore::new();
    let mut config = provisioned(&mut store);

    assert_eq!(parse_request("wipe=1"), Some(PortalRequest::Wipe));
    config.wipe(&mut store).unwrap();

    let page = render_wipe_page();
    assert!(page.contains("Credenciales borradas"));

    let rebooted = GateConfig::load(&store).unwrap();
    assert!(!rebooted.wifi.is_configured());
    assert!(!rebooted.broker.is_configured());
    assert_eq!(resolve_start_mode(&rebooted), StartMode::Provisioning);
}

#[test]
fn wipe_beats_a_simultaneous_wifi_action() {
    assert_eq!(
        parse_request("act=wifi&ssid=net&wipe=1"),
        Some(PortalRequest::Wipe)
    );
}

// ============================================================================
// Round-trip property: persisting then reloading is bytewise equal
// ============================================================================

#[test]
fn config_round_trip_is_bytewise_equal() {
    let mut store = MemStore::new();
    let config = provisioned(&mut store);
    let reloaded = GateConfig::load(&store).unwrap();

    assert_eq!(reloaded.wifi.ssid.as_bytes(), config.wifi.ssid.as_bytes());
    assert_eq!(
        reloaded.wifi.password.as_bytes(),
        config.wifi.password.as_bytes()
    );
    assert_eq!(reloaded.broker.uri.as_bytes(), config.broker.uri.as_bytes());
    assert_eq!(reloaded, config);
}
