//! Captive-portal provisioning adapter.
//!
//! Implements [`PortalPort`] — the hexagonal boundary for operator
//! provisioning. While open, the device serves a single-page form on
//! the AP's root URL; a valid submission lands in a mailbox that the
//! supervisor drains on its next poll.
//!
//! Credentials are validated *here*, at ingress: the domain only ever
//! sees well-formed SSIDs and passwords, and a malformed submission is
//! answered with HTTP 400 instead of being half-accepted.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspHttpServer` bound to the softAP.
//! - **all other targets**: simulation stubs for host-side tests.

use std::sync::{Arc, Mutex};

use super::utils::{validate_password, validate_ssid};
use crate::app::ports::{Credentials, PortalPort};
use crate::error::{LinkError, PortalError};
use crate::events::{push_event, Event};
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{Configuration as HttpConfiguration, EspHttpServer};

/// Setup page served at `/`. Deliberately dependency-free HTML so it
/// renders on anything that can open a browser.
const PORTAL_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>BeamGate Setup</title>
  <style>
    body{font-family:Arial,sans-serif;max-width:420px;margin:2rem auto;padding:0 1rem;color:#111}
    label{display:block;margin:.6rem 0 .2rem}
    input{width:100%;padding:.5rem;box-sizing:border-box}
    button{padding:.55rem .9rem;margin-top:.8rem}
  </style>
</head>
<body>
  <h1>BeamGate Setup</h1>
  <p>Enter the WiFi network this counter should join.</p>
  <form method="post" action="/save">
    <label>Network name (SSID)</label><input name="ssid" maxlength="32" required>
    <label>Password (blank for open networks)</label><input name="password" type="password" maxlength="64">
    <button type="submit">Save &amp; Connect</button>
  </form>
</body>
</html>"#;

const SAVED_HTML: &str =
    "<html><body><h1>Saved</h1><p>The device is joining the network. \
     This access point will disappear shortly.</p></body></html>";

// ───────────────────────────────────────────────────────────────
// Form decoding
// ───────────────────────────────────────────────────────────────

/// Decode one `application/x-www-form-urlencoded` value: `+` becomes a
/// space and `%XX` escapes become bytes.
fn urldecode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                let hi = char::from(hex[0]).to_digit(16)?;
                let lo = char::from(hex[1]).to_digit(16)?;
                out.push((hi * 16 + lo) as u8);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8(out).ok()
}

/// Parse the portal form body into validated credentials.
fn parse_submission(body: &str) -> Result<Credentials, LinkError> {
    let mut ssid = None;
    let mut password = None;
    for pair in body.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urldecode(value).ok_or(LinkError::InvalidSsid)?;
        match key {
            "ssid" => ssid = Some(value),
            "password" => password = Some(value),
            _ => {}
        }
    }

    let ssid = ssid.ok_or(LinkError::NoCredentials)?;
    let password = password.unwrap_or_default();
    validate_ssid(&ssid)?;
    validate_password(&password)?;
    Credentials::new(&ssid, &password)
}

// ───────────────────────────────────────────────────────────────
// Portal adapter
// ───────────────────────────────────────────────────────────────

pub struct CaptivePortal {
    /// Latest valid submission; overwritten if the operator retries.
    submission: Arc<Mutex<Option<Credentials>>>,
    #[cfg(target_os = "espidf")]
    server: Option<EspHttpServer<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_open: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_killed: bool,
}

impl CaptivePortal {
    pub fn new() -> Self {
        Self {
            submission: Arc::new(Mutex::new(None)),
            #[cfg(target_os = "espidf")]
            server: None,
            #[cfg(not(target_os = "espidf"))]
            sim_open: false,
            #[cfg(not(target_os = "espidf"))]
            sim_killed: false,
        }
    }

    /// Record a valid submission and wake the main loop.
    fn accept(mailbox: &Mutex<Option<Credentials>>, creds: Credentials) {
        info!("Portal: credentials received for '{}'", creds.ssid);
        if let Ok(mut slot) = mailbox.lock() {
            *slot = Some(creds);
        }
        push_event(Event::PortalSubmission);
    }
}

#[cfg(target_os = "espidf")]
impl PortalPort for CaptivePortal {
    fn open(&mut self) -> Result<(), PortalError> {
        if self.server.is_some() {
            return Ok(());
        }

        let mut server = EspHttpServer::new(&HttpConfiguration::default())
            .map_err(|_| PortalError::ServerStart)?;

        server
            .fn_handler("/", esp_idf_svc::http::Method::Get, |req| {
                use esp_idf_svc::io::Write;
                let mut resp = req.into_ok_response()?;
                resp.write_all(PORTAL_HTML.as_bytes())?;
                Ok::<(), esp_idf_svc::io::EspIOError>(())
            })
            .map_err(|_| PortalError::ServerStart)?;

        let mailbox = self.submission.clone();
        server
            .fn_handler("/save", esp_idf_svc::http::Method::Post, move |mut req| {
                use esp_idf_svc::io::{Read, Write};
                let mut buf = [0u8; 256];
                let len = req.read(&mut buf).unwrap_or(0);
                let body = core::str::from_utf8(&buf[..len]).unwrap_or("");

                match parse_submission(body) {
                    Ok(creds) => {
                        Self::accept(&mailbox, creds);
                        let mut resp = req.into_ok_response()?;
                        resp.write_all(SAVED_HTML.as_bytes())?;
                    }
                    Err(e) => {
                        warn!("Portal: rejected submission — {}", e);
                        let mut resp = req.into_status_response(400)?;
                        resp.write_all(b"invalid credentials")?;
                    }
                }
                Ok::<(), esp_idf_svc::io::EspIOError>(())
            })
            .map_err(|_| PortalError::ServerStart)?;

        self.server = Some(server);
        Ok(())
    }

    fn close(&mut self) {
        self.server = None;
        if let Ok(mut slot) = self.submission.lock() {
            *slot = None;
        }
    }

    fn is_serving(&self) -> bool {
        self.server.is_some()
    }

    fn take_submission(&mut self) -> Option<Credentials> {
        self.submission.lock().ok()?.take()
    }
}

#[cfg(not(target_os = "espidf"))]
impl PortalPort for CaptivePortal {
    fn open(&mut self) -> Result<(), PortalError> {
        if self.sim_killed {
            return Err(PortalError::ServerStart);
        }
        self.sim_open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.sim_open = false;
        if let Ok(mut slot) = self.submission.lock() {
            *slot = None;
        }
    }

    fn is_serving(&self) -> bool {
        self.sim_open && !self.sim_killed
    }

    fn take_submission(&mut self) -> Option<Credentials> {
        self.submission.lock().ok()?.take()
    }
}

#[cfg(not(target_os = "espidf"))]
impl CaptivePortal {
    /// Simulate an operator submitting the form.
    pub fn sim_submit(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        let mut body = String::new();
        body.push_str("ssid=");
        body.push_str(ssid);
        body.push_str("&password=");
        body.push_str(password);
        let creds = parse_submission(&body)?;
        Self::accept(&self.submission, creds);
        Ok(())
    }

    /// Simulate the HTTP server dying underneath the supervisor.
    pub fn sim_kill(&mut self) {
        self.sim_killed = true;
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
