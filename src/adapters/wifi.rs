//! WiFi link adapter.
//!
//! Implements [`LinkPort`] — the hexagonal boundary for the radio. The
//! supervisor drives everything through `begin_join` / `status` /
//! `enter_ap`, so nothing here blocks: a join is kicked off and the
//! supervisor polls the outcome against its own deadlines.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via
//!   `esp_idf_svc::wifi::EspWifi`. Station events from the system event
//!   loop are forwarded into the firmware event queue so the main loop
//!   notices link edges without polling delay.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! The driver gets no NVS partition: credential persistence is owned by
//! the firmware's own store, never by the WiFi stack.

use log::info;

use super::utils::{validate_password, validate_ssid};
use crate::app::ports::{Credentials, LinkPort, LinkStatus};
use crate::error::LinkError;

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};
#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::{EspSubscription, EspSystemEventLoop, System},
    wifi::{
        AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
        WifiEvent,
    },
};
#[cfg(target_os = "espidf")]
use std::sync::Arc;

pub struct WifiLink {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    _subscription: EspSubscription<'static, System>,
    /// Set by the sysloop callback on station disconnect.
    #[cfg(target_os = "espidf")]
    got_disconnect: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    client_conf: Option<ClientConfiguration>,
    #[cfg(target_os = "espidf")]
    ap_conf: Option<AccessPointConfiguration>,
    joining: bool,

    #[cfg(not(target_os = "espidf"))]
    sim_status: LinkStatus,
    /// Simulation: every `begin_join` target, in order.
    #[cfg(not(target_os = "espidf"))]
    pub sim_joins: Vec<Credentials>,
    #[cfg(not(target_os = "espidf"))]
    sim_ap: Option<heapless::String<32>>,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl WifiLink {
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: EspSystemEventLoop,
    ) -> crate::error::Result<Self> {
        let wifi = EspWifi::new(modem, sysloop.clone(), None)
            .map_err(|_| crate::error::Error::Init("wifi driver"))?;

        let got_disconnect = Arc::new(AtomicBool::new(false));
        let flag = got_disconnect.clone();
        let subscription = sysloop
            .subscribe::<WifiEvent, _>(move |event| match event {
                WifiEvent::StaConnected(_) => {
                    push_event(Event::LinkUp);
                }
                WifiEvent::StaDisconnected(_) => {
                    flag.store(true, Ordering::Release);
                    push_event(Event::LinkDown);
                }
                _ => {}
            })
            .map_err(|_| crate::error::Error::Init("wifi event subscription"))?;

        Ok(Self {
            wifi,
            _subscription: subscription,
            got_disconnect,
            client_conf: None,
            ap_conf: None,
            joining: false,
        })
    }

    fn apply_configuration(&mut self) -> Result<(), LinkError> {
        let conf = match (&self.client_conf, &self.ap_conf) {
            (Some(client), Some(ap)) => Configuration::Mixed(client.clone(), ap.clone()),
            (Some(client), None) => Configuration::Client(client.clone()),
            (None, Some(ap)) => Configuration::AccessPoint(ap.clone()),
            (None, None) => Configuration::Client(ClientConfiguration::default()),
        };
        self.wifi
            .set_configuration(&conf)
            .map_err(|_| LinkError::JoinFailed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| LinkError::JoinFailed)?;
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl LinkPort for WifiLink {
    fn begin_join(&mut self, creds: &Credentials) -> Result<(), LinkError> {
        validate_ssid(creds.ssid.as_str())?;
        validate_password(creds.password.as_str())?;

        let auth_method = if creds.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        self.client_conf = Some(ClientConfiguration {
            ssid: creds
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| LinkError::InvalidSsid)?,
            password: creds
                .password
                .as_str()
                .try_into()
                .map_err(|_| LinkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.apply_configuration()?;

        self.got_disconnect.store(false, Ordering::Release);
        self.joining = true;
        info!("WiFi: joining '{}'", creds.ssid);
        self.wifi.connect().map_err(|_| LinkError::JoinFailed)
    }

    fn status(&self) -> LinkStatus {
        if self.wifi.is_up().unwrap_or(false) {
            return LinkStatus::Up;
        }
        if self.got_disconnect.load(Ordering::Acquire) {
            return LinkStatus::Down;
        }
        if self.joining {
            return LinkStatus::Joining;
        }
        LinkStatus::Idle
    }

    fn enter_ap(&mut self, ap_ssid: &str) -> Result<(), LinkError> {
        self.ap_conf = Some(AccessPointConfiguration {
            ssid: ap_ssid.try_into().map_err(|_| LinkError::InvalidSsid)?,
            auth_method: AuthMethod::None,
            ..Default::default()
        });
        self.apply_configuration().map_err(|_| LinkError::ApFailed)?;
        info!("WiFi: AP '{}' up", ap_ssid);
        Ok(())
    }

    fn exit_ap(&mut self) {
        self.ap_conf = None;
        if self.apply_configuration().is_err() {
            log::warn!("WiFi: AP teardown reconfiguration failed");
        }
    }

    fn rssi(&self) -> Option<i8> {
        use esp_idf_svc::sys::*;
        let mut ap_info: wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_wifi_sta_get_ap_info(&mut ap_info) };
        (ret == ESP_OK).then_some(ap_info.rssi)
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation implementation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl WifiLink {
    pub fn new() -> Self {
        Self {
            joining: false,
            sim_status: LinkStatus::Idle,
            sim_joins: vec![],
            sim_ap: None,
        }
    }

    /// Resolve the in-flight join (true = association succeeded).
    /// No-op when no join is in flight.
    pub fn sim_complete_join(&mut self, success: bool) {
        if !self.joining {
            return;
        }
        self.joining = false;
        self.sim_status = if success {
            LinkStatus::Up
        } else {
            LinkStatus::Down
        };
    }

    /// Drop an established association.
    pub fn sim_drop_link(&mut self) {
        self.sim_status = LinkStatus::Down;
    }

    pub fn sim_ap_active(&self) -> Option<&str> {
        self.sim_ap.as_ref().map(|s| s.as_str())
    }
}

#[cfg(not(target_os = "espidf"))]
impl LinkPort for WifiLink {
    fn begin_join(&mut self, creds: &Credentials) -> Result<(), LinkError> {
        validate_ssid(creds.ssid.as_str())?;
        validate_password(creds.password.as_str())?;
        info!("WiFi(sim): joining '{}'", creds.ssid);
        self.sim_joins.push(creds.clone());
        self.joining = true;
        self.sim_status = LinkStatus::Joining;
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        self.sim_status
    }

    fn enter_ap(&mut self, ap_ssid: &str) -> Result<(), LinkError> {
        validate_ssid(ap_ssid)?;
        let mut s = heapless::String::new();
        s.push_str(ap_ssid).map_err(|()| LinkError::InvalidSsid)?;
        self.sim_ap = Some(s);
        Ok(())
    }

    fn exit_ap(&mut self) {
        self.sim_ap = None;
    }

    fn rssi(&self) -> Option<i8> {
        (self.sim_status == LinkStatus::Up).then_some(-60)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
