//! The provisioning portal HTTP server.
//!
//! One resource at `/`, GET and POST. All parsing and rendering is done by
//! [`crate::portal`]; this module only moves bytes and applies the side
//! effects of a submission:
//!
//! - `act=wifi`: persist credentials, reconfigure the station, keep the
//!   boot mode at provisioning (only an acquired IP makes it operational)
//! - `act=mqtt`: persist broker settings, restart the broker channel
//! - `wipe=1`: erase everything, confirm, reboot ~250 ms later
//!
//! Successful POSTs answer 303 back to `/`; oversized or empty bodies get
//! 400, receive failures 500.

use std::string::String;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::io::{Read, Write};
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::EspIOError;

use super::{BrokerChannel, NvsStore, WifiSupervisor};
use crate::config::{BootMode, GateConfig};
use crate::portal::{self, PortalRequest, PortalView, MAX_BODY_LEN};

/// Shared state between the portal handlers and the rest of the system.
pub struct PortalContext {
    /// The live configuration record.
    pub config: Mutex<GateConfig>,
    /// Persistent storage handle.
    pub store: Arc<Mutex<NvsStore>>,
    /// Connectivity supervisor, for reconnects on Wi-Fi submissions.
    pub wifi: Arc<WifiSupervisor>,
    /// Broker channel, restarted on broker submissions.
    pub broker: Arc<Mutex<BrokerChannel>>,
    /// Status line shown at the top of the page.
    pub message: Mutex<String>,
}

/// The portal HTTP server. Dropping it stops the server.
pub struct PortalServer {
    _server: EspHttpServer<'static>,
}

impl PortalServer {
    /// Register the `/` handlers and start serving.
    pub fn new(ctx: Arc<PortalContext>) -> Result<Self> {
        let mut server = EspHttpServer::new(&Configuration::default())?;

        let get_ctx = Arc::clone(&ctx);
        server.fn_handler("/", Method::Get, move |req| {
            let query = req.uri().split_once('?').map(|(_, q)| q).unwrap_or("");

            if let Some(request) = portal::parse_request(query) {
                if matches!(request, PortalRequest::Wipe) {
                    let page = portal::render_wipe_page();
                    let mut resp =
                        req.into_response(200, None, &[("Content-Type", "text/html")])?;
                    resp.write_all(page.as_bytes())?;
                    wipe_and_reboot(&get_ctx);
                    return Ok::<_, EspIOError>(());
                }
                dispatch(&get_ctx, request);
            } else if !query.is_empty() {
                *get_ctx.message.lock().unwrap() = "Solicitud invalida.".into();
            }

            let page = {
                let config = get_ctx.config.lock().unwrap();
                let message = get_ctx.message.lock().unwrap();
                let sta_ip = get_ctx.wifi.sta_ip();
                portal::render_page(&PortalView {
                    message: &message,
                    config: &config,
                    connected: get_ctx.wifi.is_connected(),
                    sta_ip: &sta_ip,
                })
            };
            let mut resp = req.into_response(200, None, &[("Content-Type", "text/html")])?;
            resp.write_all(page.as_bytes())?;
            Ok::<_, EspIOError>(())
        })?;

        let post_ctx = Arc::clone(&ctx);
        server.fn_handler("/", Method::Post, move |mut req| {
            let mut body = Vec::with_capacity(256);
            let mut chunk = [0u8; 256];
            loop {
                let n = match req.read(&mut chunk) {
                    Ok(n) => n,
                    Err(_) => {
                        let mut resp = req.into_status_response(500)?;
                        resp.write_all(b"Recv error")?;
                        return Ok::<_, EspIOError>(());
                    }
                };
                if n == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..n]);
                if body.len() > MAX_BODY_LEN {
                    break;
                }
            }

            if body.is_empty() || body.len() > MAX_BODY_LEN {
                let mut resp = req.into_status_response(400)?;
                resp.write_all(b"Body too long or empty")?;
                return Ok::<_, EspIOError>(());
            }

            let body = String::from_utf8_lossy(&body);
            match portal::parse_request(&body) {
                Some(PortalRequest::Wipe) => {
                    let page = portal::render_wipe_page();
                    let mut resp =
                        req.into_response(200, None, &[("Content-Type", "text/html")])?;
                    resp.write_all(page.as_bytes())?;
                    wipe_and_reboot(&post_ctx);
                    return Ok::<_, EspIOError>(());
                }
                Some(request) => dispatch(&post_ctx, request),
                None => {
                    *post_ctx.message.lock().unwrap() = "Solicitud invalida.".into();
                }
            }

            let mut resp = req.into_response(303, None, &[("Location", "/")])?;
            resp.write_all(&[])?;
            Ok::<_, EspIOError>(())
        })?;

        log::info!("portal server started");
        Ok(Self { _server: server })
    }
}

/// Apply one save request: mutate the record, persist, trigger the owning
/// component.
fn dispatch(ctx: &PortalContext, request: PortalRequest) {
    match &request {
        PortalRequest::SaveWifi { ssid, .. } => {
            let creds = {
                let mut config = ctx.config.lock().unwrap();
                portal::apply_request(&request, &mut config);
                let mut store = ctx.store.lock().unwrap();
                let _ = config.save_wifi(&mut *store);
                // Stay in provisioning until an IP is actually acquired.
                let _ = config.save_boot_mode(&mut *store, BootMode::Provisioning);
                config.wifi.clone()
            };

            let message = match ctx.wifi.apply_station(&creds) {
                Ok(()) => format!("Guardado WiFi. Conectando a '{}'...", ssid),
                Err(e) => {
                    log::warn!("station reconfigure failed: {:?}", e);
                    "No se pudo reconfigurar WiFi.".into()
                }
            };
            *ctx.message.lock().unwrap() = message;
        }

        PortalRequest::SaveBroker { .. } => {
            let broker_config = {
                let mut config = ctx.config.lock().unwrap();
                portal::apply_request(&request, &mut config);
                let mut store = ctx.store.lock().unwrap();
                let _ = config.save_broker(&mut *store);
                config.broker.clone()
            };

            // Restarted even when nothing changed: the form doubles as a
            // force-reconnect button.
            if let Err(e) = ctx.broker.lock().unwrap().restart(broker_config) {
                log::warn!("broker restart failed: {:?}", e);
            }
            *ctx.message.lock().unwrap() = "Parametros MQTT actualizados.".into();
        }

        PortalRequest::Wipe => unreachable!("wipe handled by the caller"),
    }
}

/// Erase everything and restart shortly after the response is flushed.
fn wipe_and_reboot(ctx: &PortalContext) {
    {
        let mut config = ctx.config.lock().unwrap();
        let mut store = ctx.store.lock().unwrap();
        let _ = config.wipe(&mut *store);
    }
    thread::spawn(|| {
        thread::sleep(Duration::from_millis(250));
        esp_idf_hal::reset::restart();
    });
}
