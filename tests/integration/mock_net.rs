//! Shared test doubles for the integration suite.
//!
//! The WiFi, portal, and MQTT adapters already carry simulation
//! backends on non-espidf targets; this module only adds what those
//! don't cover — an in-memory credential store and a recording event
//! sink that tests can assert on.

use beamgate::adapters::hardware::BeamInput;
use beamgate::adapters::mqtt::MqttSession;
use beamgate::adapters::portal::CaptivePortal;
use beamgate::adapters::wifi::WifiLink;
use beamgate::app::events::AppEvent;
use beamgate::app::ports::{CredentialStore, Credentials, EventSink, StorageError};
use beamgate::app::service::AppService;
use beamgate::config::SystemConfig;

// ── In-memory credential store ────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    pub creds: Option<Credentials>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(ssid: &str, password: &str) -> Self {
        Self {
            creds: Some(Credentials::new(ssid, password).unwrap()),
        }
    }
}

impl CredentialStore for MemStore {
    fn load_credentials(&self) -> Option<Credentials> {
        self.creds.clone()
    }

    fn store_credentials(&mut self, creds: &Credentials) -> Result<(), StorageError> {
        self.creds = Some(creds.clone());
        Ok(())
    }

    fn clear_credentials(&mut self) -> Result<(), StorageError> {
        self.creds = None;
        Ok(())
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beam_changes(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::BeamChanged { from, to, .. } => {
                    Some((from.to_string(), to.to_string()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn conn_changes(&self) -> Vec<(&'static str, &'static str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::ConnectivityChanged { from, to } => Some((from.as_str(), to.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn dropped_publishes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::PublishDropped { .. }))
            .count()
    }

    pub fn status_reports(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Status(_)))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Full device rig ───────────────────────────────────────────

/// A complete simulated device: AppService wired to the adapters'
/// simulation backends, advanced in poll-cadence steps.
pub struct Rig {
    pub app: AppService,
    pub beam: BeamInput,
    pub wifi: WifiLink,
    pub portal: CaptivePortal,
    pub broker: MqttSession,
    pub store: MemStore,
    pub sink: RecordingSink,
    pub now_ms: u64,
    step_ms: u64,
}

impl Rig {
    pub fn new(config: SystemConfig, store: MemStore) -> Self {
        let beam = BeamInput::new(config.sensor_active_low);
        let broker = MqttSession::new(&config);
        let step_ms = u64::from(config.poll_interval_ms);
        let mut ap_ssid = heapless::String::new();
        ap_ssid.push_str("beamgate-AABBCC").unwrap();
        let app = AppService::new(config.clone(), config.client_id.clone(), ap_ssid);

        Self {
            app,
            beam,
            wifi: WifiLink::new(),
            portal: CaptivePortal::new(),
            broker,
            store,
            sink: RecordingSink::new(),
            now_ms: 0,
            step_ms,
        }
    }

    pub fn start(&mut self) -> beamgate::Result<()> {
        self.app.start(
            self.now_ms,
            &mut self.beam,
            &mut self.wifi,
            &mut self.portal,
            &self.store,
            &mut self.sink,
        )
    }

    /// Advance one poll interval and run a cycle.
    pub fn tick(&mut self) -> beamgate::Result<()> {
        self.now_ms += self.step_ms;
        self.app.tick(
            self.now_ms,
            &mut self.beam,
            &mut self.wifi,
            &mut self.portal,
            &mut self.broker,
            &mut self.store,
            &mut self.sink,
        )
    }

    /// Run cycles until `duration_ms` of simulated time has elapsed.
    pub fn run_for_ms(&mut self, duration_ms: u64) -> beamgate::Result<()> {
        let end = self.now_ms + duration_ms;
        while self.now_ms < end {
            self.tick()?;
        }
        Ok(())
    }

    /// Boot with no stored credentials and provision through the portal.
    pub fn connect_via_portal(&mut self) {
        self.start().unwrap();
        self.portal.sim_submit("TestNet", "password1").unwrap();
        self.tick().unwrap();
        self.wifi.sim_complete_join(true);
        self.tick().unwrap();
        assert!(self.app.is_connected(), "rig should be connected");
    }
}
