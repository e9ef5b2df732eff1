//! Gate controller firmware entry point.
//!
//! Bootstrap order: logger, NVS, configuration record, gate I/O,
//! connectivity supervisor, provisioning portal, broker channel, and
//! finally the FSM task. The main thread parks after handoff.
//!
//! # Build
//!
//! ```bash
//! cargo build --bin esp32_main --features esp32 --target xtensa-esp32-espidf
//! ```

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{InputPin, OutputPin};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use rs_gate::hal::esp32::{
    pins, BrokerChannel, Esp32Clock, Esp32Delay, Esp32Gate, NvsStore, PortalContext, PortalServer,
    WifiSupervisor,
};
use rs_gate::traits::Clock;
use rs_gate::{CommandQueue, GateConfig, GateFsm, GateSnapshot, StatusPublisher};

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();

    log::info!("================================");
    log::info!("  rs-gate controller");
    log::info!("================================");

    // =========================================================================
    // Storage and configuration
    // =========================================================================
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let store = Arc::new(Mutex::new(NvsStore::open(nvs_partition.clone())?));
    let config = GateConfig::load(&*store.lock().unwrap())?;
    log::info!(
        "[OK] config loaded (ssid='{}', broker='{}')",
        config.wifi.ssid,
        config.broker.uri
    );

    // =========================================================================
    // Gate I/O
    // =========================================================================
    let peripherals = Peripherals::take()?;
    let io = Esp32Gate::new(
        peripherals.pins.gpio34.downgrade_input(),
        peripherals.pins.gpio35.downgrade_input(),
        peripherals.pins.gpio13.downgrade_output(),
        peripherals.pins.gpio12.downgrade_output(),
        peripherals.pins.gpio2.downgrade_output(),
    )?;
    log::info!(
        "[OK] gate I/O (LSA={}, LSC={}, MA={}, MC={}, LAMP={})",
        pins::LIMIT_OPEN,
        pins::LIMIT_CLOSED,
        pins::MOTOR_OPEN,
        pins::MOTOR_CLOSE,
        pins::LAMP
    );

    // =========================================================================
    // Connectivity
    // =========================================================================
    let sysloop = EspSystemEventLoop::take()?;
    let wifi = Arc::new(WifiSupervisor::start(
        peripherals.modem,
        sysloop,
        Arc::clone(&store),
        &config,
    )?);
    log::info!("[OK] connectivity supervisor");

    // =========================================================================
    // Command queue and shared snapshot
    // =========================================================================
    let queue = Arc::new(Mutex::new(CommandQueue::new()));
    let snapshot = Arc::new(Mutex::new(GateSnapshot::default()));

    // =========================================================================
    // Broker channel (dormant without a configured URI)
    // =========================================================================
    let broker = Arc::new(Mutex::new(BrokerChannel::new(
        config.broker.clone(),
        Arc::clone(&queue),
        Arc::clone(&snapshot),
    )?));
    log::info!("[OK] broker channel");

    // =========================================================================
    // Provisioning portal
    // =========================================================================
    let _portal = PortalServer::new(Arc::new(PortalContext {
        config: Mutex::new(config),
        store: Arc::clone(&store),
        wifi: Arc::clone(&wifi),
        broker: Arc::clone(&broker),
        message: Mutex::new("Ingrese SSID, contrasena y parametros MQTT; luego Guardar.".into()),
    }))?;
    log::info!("[OK] provisioning portal");

    // =========================================================================
    // FSM task
    // =========================================================================
    let fsm_queue = Arc::clone(&queue);
    let fsm_snapshot = Arc::clone(&snapshot);
    let fsm_broker = Arc::clone(&broker);
    thread::Builder::new()
        .name("gate_fsm".into())
        .stack_size(8192)
        .spawn(move || {
            let clock = Esp32Clock::new();
            let mut fsm = GateFsm::new(io, Esp32Delay::new());
            let mut publisher = StatusPublisher::new(clock.now_ms());

            loop {
                let now = clock.now_ms();
                {
                    let mut queue = fsm_queue.lock().unwrap();
                    if let Err(e) = fsm.step(&mut queue, now) {
                        log::error!("gate I/O failure: {:?}", e);
                    }
                }

                let snap = fsm.snapshot();
                *fsm_snapshot.lock().unwrap() = snap;

                {
                    let mut broker = fsm_broker.lock().unwrap();
                    let broker_config = broker.config().clone();
                    publisher.tick(&snap, now, &mut *broker, &broker_config);
                }

                thread::sleep(Duration::from_millis(fsm.cycle_ms()));
            }
        })?;

    log::info!("system started");
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}
