//! System configuration parameters
//!
//! All tunable parameters for the BeamGate firmware.
//! Values can be overridden via NVS; defaults match the field wiring
//! (open-collector beam receiver to GND on GPIO 27).

use serde::{Deserialize, Serialize};

use crate::pins;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Beam sensor ---
    /// GPIO the beam receiver output is wired to.
    pub sensor_gpio: i32,
    /// Enable the internal pull-up (receiver is a contact to GND).
    pub sensor_pull_up: bool,
    /// LOW level means the beam is interrupted.
    pub sensor_active_low: bool,
    /// Settle interval before a raw level change becomes the stable state.
    pub debounce_delay_ms: u32,
    /// Main loop cadence; must stay well under the debounce delay so the
    /// debouncer sees several samples per settle window.
    pub poll_interval_ms: u32,

    // --- Broker ---
    /// MQTT broker host (IP or hostname reachable from the device).
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    /// Username/password, blank = anonymous.
    pub broker_username: heapless::String<32>,
    pub broker_password: heapless::String<64>,
    /// Fixed client identifier — must be unique across the fleet; a
    /// duplicate gets its session taken over by the broker.
    pub client_id: heapless::String<32>,
    pub state_topic: heapless::String<64>,
    pub heartbeat_topic: heapless::String<64>,

    // --- Connectivity ---
    /// Window for a single join attempt with stored credentials.
    pub join_timeout_secs: u32,
    /// Provisioning portal window before the fallback path is tried.
    pub portal_timeout_secs: u32,
    /// Window for the compiled-in fallback credential attempt.
    pub fallback_timeout_secs: u32,
    /// Fallback network, blank SSID = disabled.
    pub fallback_ssid: heapless::String<32>,
    pub fallback_password: heapless::String<64>,
    /// Bounded auto-reconnect attempts after link loss before the
    /// portal flow is re-entered.
    pub reconnect_retry_budget: u8,

    // --- Timing ---
    /// Heartbeat + status report interval (seconds).
    pub heartbeat_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut broker_host = heapless::String::new();
        let _ = broker_host.push_str("192.168.1.100");
        let mut client_id = heapless::String::new();
        let _ = client_id.push_str("ESP32_Barrier_001");
        let mut state_topic = heapless::String::new();
        let _ = state_topic.push_str("sensors/barrier/state");
        let mut heartbeat_topic = heapless::String::new();
        let _ = heartbeat_topic.push_str("sensors/barrier/heartbeat");

        Self {
            // Beam sensor
            sensor_gpio: pins::BEAM_GPIO,
            sensor_pull_up: true,
            sensor_active_low: true,
            debounce_delay_ms: 50,
            poll_interval_ms: 10,

            // Broker
            broker_host,
            broker_port: 1883,
            broker_username: heapless::String::new(),
            broker_password: heapless::String::new(),
            client_id,
            state_topic,
            heartbeat_topic,

            // Connectivity
            join_timeout_secs: 30,
            portal_timeout_secs: 180, // 3 minutes
            fallback_timeout_secs: 20,
            fallback_ssid: heapless::String::new(),
            fallback_password: heapless::String::new(),
            reconnect_retry_budget: 5,

            // Timing
            heartbeat_interval_secs: 60, // 1/min
        }
    }
}

impl SystemConfig {
    /// Whether fallback credentials are configured at all.
    pub fn has_fallback(&self) -> bool {
        !self.fallback_ssid.is_empty()
    }
}
