//! Provisioning portal logic.
//!
//! The portal is a single HTTP resource at `/` with two forms (Wi-Fi and
//! broker) and a wipe button. Everything that can be tested without an HTTP
//! server lives here as pure functions: URL decoding, form field extraction,
//! request classification, config mutation, and page rendering. The ESP32
//! binding (`hal::esp32::http`) only moves bytes between the server and
//! these functions.
//!
//! # Request grammar
//!
//! Both the GET query string and the POST body use the same
//! `application/x-www-form-urlencoded` key/value grammar:
//!
//! - `wipe=1` - erase credentials and reboot into the configuration AP
//! - `act=wifi&ssid=...&pass=...` - save credentials and reconnect
//! - `act=mqtt&broker=...&t1=...&t2=...&t3=...` - save broker settings and
//!   restart the channel (empty fields leave the stored value untouched)
//!
//! POST bodies are capped at [`MAX_BODY_LEN`] bytes; larger or empty bodies
//! are rejected with HTTP 400 before parsing.

use crate::config::GateConfig;
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Upper bound on an accepted POST body.
pub const MAX_BODY_LEN: usize = 2048;

// ============================================================================
// URL decoding
// ============================================================================

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(10 + c - b'a'),
        b'A'..=b'F' => Some(10 + c - b'A'),
        _ => None,
    }
}

/// Decode one `application/x-www-form-urlencoded` value.
///
/// - `+` becomes a space
/// - `%HH` becomes the byte `0xHH`
/// - malformed escapes (`%ZZ`, truncated `%4`) pass through literally
///
/// Decoded bytes that do not form valid UTF-8 are replaced, never dropped.
///
/// # Examples
///
/// ```rust
/// use rs_gate::portal::url_decode;
///
/// assert_eq!(url_decode("a%20b+c"), "a b c");
/// assert_eq!(url_decode("%ZZ"), "%ZZ");
/// assert_eq!(url_decode("caf%C3%A9"), "café");
/// ```
pub fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                if let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2)) {
                    if let (Some(h), Some(l)) = (hex_val(hi), hex_val(lo)) {
                        out.push((h << 4) | l);
                        i += 3;
                        continue;
                    }
                }
                // Invalid or truncated escape: keep the literal '%'.
                out.push(b'%');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Extract and decode one field from a key/value string.
///
/// Returns `None` if the key is absent (an empty value returns an empty
/// string, which callers treat as "leave unchanged" where applicable).
pub fn form_value(kv: &str, key: &str) -> Option<String> {
    kv.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then(|| url_decode(v))
    })
}

// ============================================================================
// Request classification
// ============================================================================

/// A classified portal submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortalRequest {
    /// Erase all credentials, force provisioning, reboot.
    Wipe,
    /// Save Wi-Fi credentials and start a supervised connect attempt.
    SaveWifi {
        /// Non-empty SSID.
        ssid: String,
        /// Password; empty selects an open network.
        password: String,
    },
    /// Save broker settings (non-empty fields only) and restart the channel.
    SaveBroker {
        /// Broker URI, `None` to keep the stored value.
        uri: Option<String>,
        /// Command topic, `None` to keep the stored value.
        topic_cmd: Option<String>,
        /// Status topic, `None` to keep the stored value.
        topic_status: Option<String>,
        /// Telemetry topic, `None` to keep the stored value.
        topic_tele: Option<String>,
    },
}

/// Classify a query string or POST body.
///
/// `wipe=1` takes precedence over any `act`. An `act=wifi` submission
/// without a non-empty `ssid` is invalid and yields `None` (the portal
/// re-renders with an error message). Unknown or absent actions yield
/// `None`.
pub fn parse_request(kv: &str) -> Option<PortalRequest> {
    if form_value(kv, "wipe").as_deref() == Some("1") {
        return Some(PortalRequest::Wipe);
    }

    match form_value(kv, "act")?.as_str() {
        "wifi" => {
            let ssid = form_value(kv, "ssid")?;
            if ssid.is_empty() {
                log::warn!("wifi form rejected: empty ssid");
                return None;
            }
            let password = form_value(kv, "pass").unwrap_or_default();
            Some(PortalRequest::SaveWifi { ssid, password })
        }
        "mqtt" => {
            let field = |key| form_value(kv, key).filter(|v: &String| !v.is_empty());
            Some(PortalRequest::SaveBroker {
                uri: field("broker"),
                topic_cmd: field("t1"),
                topic_status: field("t2"),
                topic_tele: field("t3"),
            })
        }
        other => {
            log::debug!("unknown portal action '{}'", other);
            None
        }
    }
}

/// Apply a save request to the in-memory record.
///
/// Persistence and side effects (reconnect, broker restart, reboot) are the
/// caller's job; this only mutates the record. `Wipe` is intentionally not
/// handled here - it goes through [`GateConfig::wipe`].
pub fn apply_request(request: &PortalRequest, config: &mut GateConfig) {
    match request {
        PortalRequest::SaveWifi { ssid, password } => {
            config.wifi = crate::config::WifiCredentials::new(ssid, password);
        }
        PortalRequest::SaveBroker {
            uri,
            topic_cmd,
            topic_status,
            topic_tele,
        } => {
            if let Some(uri) = uri {
                config.broker.uri = crate::config::bounded(uri);
            }
            if let Some(t) = topic_cmd {
                config.broker.topic_cmd = crate::config::bounded(t);
            }
            if let Some(t) = topic_status {
                config.broker.topic_status = crate::config::bounded(t);
            }
            if let Some(t) = topic_tele {
                config.broker.topic_tele = crate::config::bounded(t);
            }
        }
        PortalRequest::Wipe => {}
    }
}

// ============================================================================
// Page rendering
// ============================================================================

/// Everything the status page displays.
#[derive(Clone, Debug)]
pub struct PortalView<'a> {
    /// One-line outcome of the last action or connection progress.
    pub message: &'a str,
    /// Current configuration record.
    pub config: &'a GateConfig,
    /// Station currently connected.
    pub connected: bool,
    /// Station IP as text, `0.0.0.0` while disconnected.
    pub sta_ip: &'a str,
}

/// Render the portal page.
pub fn render_page(view: &PortalView) -> String {
    let ssid = view.config.wifi.ssid.as_str();
    let mut page = String::with_capacity(2048);

    page.push_str(
        "<!DOCTYPE html><html><head><meta charset='UTF-8'>\
         <title>Config Porton</title></head><body>",
    );
    page.push_str("<h2>Porton Automatico</h2>");
    page.push_str(&format!("<p><b>Mensaje:</b> {}</p>", view.message));

    page.push_str("<hr><h3>WiFi (STA)</h3>");
    page.push_str(&format!(
        "<p>SSID actual: {}</p>",
        if ssid.is_empty() { "(no configurado)" } else { ssid }
    ));
    page.push_str(&format!(
        "<p>Conectado: {}</p>",
        if view.connected { "SI" } else { "NO" }
    ));
    page.push_str(&format!(
        "<p>IP STA: {}</p>",
        if view.connected { view.sta_ip } else { "0.0.0.0" }
    ));

    page.push_str("<form action='/' method='POST'>");
    page.push_str("<input type='hidden' name='act' value='wifi'>");
    page.push_str("<fieldset><legend>Red WiFi</legend>");
    page.push_str(&format!(
        "SSID: <input name='ssid' value='{}' required><br><br>",
        ssid
    ));
    page.push_str("Password: <input type='password' name='pass'><br>");
    page.push_str("</fieldset><br><button type='submit'>Guardar WiFi</button></form>");

    page.push_str("<br><form action='/' method='POST'>");
    page.push_str("<input type='hidden' name='act' value='mqtt'>");
    page.push_str("<fieldset><legend>MQTT</legend>");
    page.push_str(&format!(
        "Broker (URI): <input name='broker' value='{}' placeholder='mqtt://host:1883' style='width:360px'><br><br>",
        view.config.broker.uri
    ));
    page.push_str(&format!(
        "Topico 1 (CMD - suscripcion): <input name='t1' value='{}' style='width:360px'><br><br>",
        view.config.broker.topic_cmd
    ));
    page.push_str(&format!(
        "Topico 2 (STATUS - publicacion): <input name='t2' value='{}' style='width:360px'><br><br>",
        view.config.broker.topic_status
    ));
    page.push_str(&format!(
        "Topico 3 (TELE - publicacion): <input name='t3' value='{}' style='width:360px'><br>",
        view.config.broker.topic_tele
    ));
    page.push_str("</fieldset><br><button type='submit'>Guardar MQTT</button></form>");

    page.push_str("<hr><form action='/' method='GET'>");
    page.push_str("<input type='hidden' name='wipe' value='1'>");
    page.push_str(
        "<button type='submit' style='background:#c00;color:#fff;padding:8px 12px;\
         border:0;border-radius:6px;'>Borrar credenciales y volver a AP</button></form>",
    );
    page.push_str(&format!(
        "<p>AP de configuracion: SSID '{}' / pass '{}' (activo solo si no hay conexion).</p>",
        crate::connectivity::AP_SSID,
        crate::connectivity::AP_PASSWORD
    ));
    page.push_str("</body></html>");
    page
}

/// Render the wipe confirmation page shown just before the reboot.
pub fn render_wipe_page() -> String {
    "<html><body><h3>Credenciales borradas.</h3><p>Reiniciando...</p></body></html>".to_owned()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrokerConfig, WifiCredentials};

    // =========================================================================
    // url_decode
    // =========================================================================

    #[test]
    fn decode_plus_and_percent() {
        assert_eq!(url_decode("a%20b+c"), "a b c");
    }

    #[test]
    fn decode_passthrough_plain() {
        assert_eq!(url_decode("gate/cmd"), "gate/cmd");
        assert_eq!(url_decode(""), "");
    }

    #[test]
    fn decode_invalid_escape_is_literal() {
        assert_eq!(url_decode("%ZZ"), "%ZZ");
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("%4"), "%4");
    }

    #[test]
    fn decode_mixed_case_hex() {
        assert_eq!(url_decode("%2f%2F"), "//");
    }

    #[test]
    fn decode_multibyte_utf8() {
        assert_eq!(url_decode("se%C3%B1al"), "señal");
    }

    // =========================================================================
    // form_value
    // =========================================================================

    #[test]
    fn form_value_extracts_and_decodes() {
        let body = "act=wifi&ssid=My+Net&pass=p%40ss";
        assert_eq!(form_value(body, "act").as_deref(), Some("wifi"));
        assert_eq!(form_value(body, "ssid").as_deref(), Some("My Net"));
        assert_eq!(form_value(body, "pass").as_deref(), Some("p@ss"));
    }

    #[test]
    fn form_value_absent_key() {
        assert_eq!(form_value("act=wifi", "ssid"), None);
    }

    #[test]
    fn form_value_empty_value() {
        assert_eq!(form_value("ssid=&act=wifi", "ssid").as_deref(), Some(""));
    }

    #[test]
    fn form_value_key_is_exact() {
        assert_eq!(form_value("ssid2=x", "ssid"), None);
    }

    // =========================================================================
    // parse_request
    // =========================================================================

    #[test]
    fn wipe_wins_over_act() {
        assert_eq!(
            parse_request("wipe=1&act=wifi&ssid=net"),
            Some(PortalRequest::Wipe)
        );
    }

    #[test]
    fn wipe_requires_exact_value() {
        assert_eq!(parse_request("wipe=0"), None);
        assert_eq!(parse_request("wipe="), None);
    }

    #[test]
    fn wifi_form_parses() {
        assert_eq!(
            parse_request("act=wifi&ssid=My+Net&pass=secret%21"),
            Some(PortalRequest::SaveWifi {
                ssid: "My Net".into(),
                password: "secret!".into()
            })
        );
    }

    #[test]
    fn wifi_form_password_optional() {
        assert_eq!(
            parse_request("act=wifi&ssid=open-net"),
            Some(PortalRequest::SaveWifi {
                ssid: "open-net".into(),
                password: String::new()
            })
        );
    }

    #[test]
    fn wifi_form_rejects_empty_ssid() {
        assert_eq!(parse_request("act=wifi&ssid=&pass=x"), None);
        assert_eq!(parse_request("act=wifi&pass=x"), None);
    }

    #[test]
    fn mqtt_form_keeps_empty_fields() {
        assert_eq!(
            parse_request("act=mqtt&broker=mqtt%3A%2F%2Fb%3A1883&t1=&t2=g%2Fstatus&t3="),
            Some(PortalRequest::SaveBroker {
                uri: Some("mqtt://b:1883".into()),
                topic_cmd: None,
                topic_status: Some("g/status".into()),
                topic_tele: None,
            })
        );
    }

    #[test]
    fn mqtt_form_all_empty_still_valid() {
        // Submitting the untouched form still restarts the broker channel.
        assert_eq!(
            parse_request("act=mqtt"),
            Some(PortalRequest::SaveBroker {
                uri: None,
                topic_cmd: None,
                topic_status: None,
                topic_tele: None,
            })
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert_eq!(parse_request("act=reboot"), None);
        assert_eq!(parse_request(""), None);
        assert_eq!(parse_request("foo=bar"), None);
    }

    // =========================================================================
    // apply_request
    // =========================================================================

    #[test]
    fn apply_wifi_overwrites_credentials() {
        let mut config = GateConfig::default().with_wifi(WifiCredentials::new("old", "oldpw"));
        apply_request(
            &PortalRequest::SaveWifi {
                ssid: "new".into(),
                password: "newpw".into(),
            },
            &mut config,
        );
        assert_eq!(config.wifi.ssid.as_str(), "new");
        assert_eq!(config.wifi.password.as_str(), "newpw");
    }

    #[test]
    fn apply_broker_only_touches_provided_fields() {
        let mut config = GateConfig::default().with_broker(
            BrokerConfig::default()
                .with_uri("mqtt://old:1883")
                .with_topics("old/cmd", "old/status", "old/tele"),
        );

        apply_request(
            &PortalRequest::SaveBroker {
                uri: None,
                topic_cmd: Some("new/cmd".into()),
                topic_status: None,
                topic_tele: None,
            },
            &mut config,
        );

        assert_eq!(config.broker.uri.as_str(), "mqtt://old:1883");
        assert_eq!(config.broker.topic_cmd.as_str(), "new/cmd");
        assert_eq!(config.broker.topic_status.as_str(), "old/status");
        assert_eq!(config.broker.topic_tele.as_str(), "old/tele");
    }

    // =========================================================================
    // rendering
    // =========================================================================

    #[test]
    fn page_shows_config_and_forms() {
        let config = GateConfig::default()
            .with_wifi(WifiCredentials::new("HomeNet", "pw"))
            .with_broker(BrokerConfig::default().with_uri("mqtt://b:1883"));
        let view = PortalView {
            message: "Guardado WiFi.",
            config: &config,
            connected: true,
            sta_ip: "192.168.1.50",
        };

        let page = render_page(&view);
        assert!(page.contains("Guardado WiFi."));
        assert!(page.contains("value='HomeNet'"));
        assert!(page.contains("192.168.1.50"));
        assert!(page.contains("name='act' value='wifi'"));
        assert!(page.contains("name='act' value='mqtt'"));
        assert!(page.contains("name='wipe' value='1'"));
        assert!(page.contains(crate::connectivity::AP_SSID));
    }

    #[test]
    fn page_masks_ip_while_disconnected() {
        let config = GateConfig::default();
        let view = PortalView {
            message: "",
            config: &config,
            connected: false,
            sta_ip: "192.168.1.50",
        };
        let page = render_page(&view);
        assert!(page.contains("IP STA: 0.0.0.0"));
        assert!(page.contains("(no configurado)"));
    }

    #[test]
    fn wipe_page_announces_reboot() {
        let page = render_wipe_page();
        assert!(page.contains("Credenciales borradas"));
        assert!(page.contains("Reiniciando"));
    }
}
