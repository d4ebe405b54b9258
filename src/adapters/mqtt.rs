//! MQTT session adapter.
//!
//! Implements [`BrokerPort`] on top of the ESP-IDF MQTT client. One
//! session at a time: `open_session` builds a fresh client, and a
//! reconnect is a teardown plus a new open — the
//! [`BrokerClient`](crate::net::broker::BrokerClient) decides when.
//!
//! The configured client identifier is fixed per device. A duplicate id
//! across the fleet causes broker-side session takeover; that is an
//! operational constraint, not something this adapter detects.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with a callback that
//!   tracks connection state in an atomic flag. The client runs its own
//!   keep-alive task, so [`service`](BrokerPort::service) has nothing
//!   to pump on hardware.
//! - **all other targets**: simulation stubs for host-side tests.

use log::info;

use crate::app::ports::BrokerPort;
use crate::config::SystemConfig;
use crate::error::BrokerError;

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
#[cfg(target_os = "espidf")]
use std::sync::Arc;

pub struct MqttSession {
    host: heapless::String<64>,
    port: u16,
    client_id: heapless::String<32>,
    username: heapless::String<32>,
    password: heapless::String<64>,

    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,

    #[cfg(not(target_os = "espidf"))]
    sim_up: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_refuse_open: bool,
    #[cfg(not(target_os = "espidf"))]
    pub sim_published: Vec<(String, Vec<u8>)>,
}

impl MqttSession {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            host: cfg.broker_host.clone(),
            port: cfg.broker_port,
            client_id: cfg.client_id.clone(),
            username: cfg.broker_username.clone(),
            password: cfg.broker_password.clone(),

            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),

            #[cfg(not(target_os = "espidf"))]
            sim_up: false,
            #[cfg(not(target_os = "espidf"))]
            sim_refuse_open: false,
            #[cfg(not(target_os = "espidf"))]
            sim_published: vec![],
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl BrokerPort for MqttSession {
    fn open_session(&mut self) -> Result<(), BrokerError> {
        if self.client.is_some() {
            return Ok(());
        }
        if self.host.is_empty() || self.client_id.is_empty() {
            return Err(BrokerError::BadConfig);
        }

        let url = format!("mqtt://{}:{}", self.host, self.port);
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            username: (!self.username.is_empty()).then(|| self.username.as_str()),
            password: (!self.password.is_empty()).then(|| self.password.as_str()),
            ..Default::default()
        };

        self.connected.store(false, Ordering::Release);
        let flag = self.connected.clone();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                flag.store(true, Ordering::Release);
            }
            EventPayload::Disconnected => {
                flag.store(false, Ordering::Release);
            }
            _ => {}
        })
        .map_err(|_| BrokerError::ConnectFailed)?;

        info!("MQTT: session to {} as '{}'", url, self.client_id);
        self.client = Some(client);
        Ok(())
    }

    fn close_session(&mut self) {
        self.client = None;
        self.connected.store(false, Ordering::Release);
    }

    fn session_up(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Acquire)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let client = self.client.as_mut().ok_or(BrokerError::SessionClosed)?;
        client
            .enqueue(topic, QoS::AtLeastOnce, false, payload)
            .map(|_| ())
            .map_err(|_| BrokerError::PublishRejected)
    }

    fn service(&mut self) {
        // Keep-alive and inbound housekeeping run on the client's own
        // task; nothing to pump here.
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation implementation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl MqttSession {
    /// Refuse subsequent `open_session` calls (broker unreachable).
    pub fn sim_refuse_open(&mut self, refuse: bool) {
        self.sim_refuse_open = refuse;
    }

    /// Drop the session out from under the client.
    pub fn sim_drop_session(&mut self) {
        self.sim_up = false;
    }
}

#[cfg(not(target_os = "espidf"))]
impl BrokerPort for MqttSession {
    fn open_session(&mut self) -> Result<(), BrokerError> {
        if self.host.is_empty() || self.client_id.is_empty() {
            return Err(BrokerError::BadConfig);
        }
        if self.sim_refuse_open {
            return Err(BrokerError::ConnectFailed);
        }
        let auth = if self.username.is_empty() && self.password.is_empty() {
            "anonymous"
        } else {
            "authenticated"
        };
        info!(
            "MQTT(sim): session to {}:{} as '{}' ({})",
            self.host, self.port, self.client_id, auth
        );
        self.sim_up = true;
        Ok(())
    }

    fn close_session(&mut self) {
        self.sim_up = false;
    }

    fn session_up(&self) -> bool {
        self.sim_up
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        if !self.sim_up {
            return Err(BrokerError::SessionClosed);
        }
        self.sim_published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn service(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
