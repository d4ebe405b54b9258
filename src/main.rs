//! BeamGate Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single cooperative loop:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BeamInput       WifiLink       CaptivePortal    MqttSession   │
//! │  (SensorPort)    (LinkPort)     (PortalPort)     (BrokerPort)  │
//! │  NvsAdapter      LogEventSink   MonotonicClock                 │
//! │  (Config+Creds)  (EventSink)                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Debounce · Connectivity FSM · Publication             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (heartbeat cadence) · Watchdog (fed every cycle)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::gpio::IOPin;

use beamgate::adapters::device_id;
use beamgate::adapters::hardware::BeamInput;
use beamgate::adapters::log_sink::LogEventSink;
use beamgate::adapters::mqtt::MqttSession;
use beamgate::adapters::nvs::NvsAdapter;
use beamgate::adapters::portal::CaptivePortal;
use beamgate::adapters::time::MonotonicClock;
use beamgate::adapters::wifi::WifiLink;
use beamgate::app::ports::ConfigPort;
use beamgate::app::service::AppService;
use beamgate::config::SystemConfig;
use beamgate::diagnostics::{self, CrashEntry, CrashLog};
use beamgate::drivers::watchdog::Watchdog;
use beamgate::events::{self, Event};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BeamGate v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();

    // ── 2. NVS + configuration ────────────────────────────────
    let mut nvs = NvsAdapter::new()
        .map_err(|e| anyhow::anyhow!("NVS init failed: {e} — cannot store credentials"))?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    let dev_id = device_id::device_id(&mac);
    let ap_ssid = device_id::ap_ssid(&mac);
    info!(
        "Device: {} | MQTT client '{}' | portal AP '{}'",
        dev_id, config.client_id, ap_ssid
    );

    // ── 4. Peripherals + adapters ─────────────────────────────
    let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
    let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;

    // The receiver is wired to GPIO 27 on this board revision.
    if config.sensor_gpio != 27 {
        warn!(
            "sensor_gpio={} configured, but the board wiring fixes the input to GPIO 27",
            config.sensor_gpio
        );
    }
    let beam_pin = peripherals.pins.gpio27.downgrade();
    let mut beam = BeamInput::new(beam_pin, config.sensor_pull_up, config.sensor_active_low)
        .map_err(|e| anyhow::anyhow!("beam input init failed: {e}"))?;

    let mut wifi = WifiLink::new(peripherals.modem, sysloop)
        .map_err(|e| anyhow::anyhow!("wifi init failed: {e}"))?;
    let mut portal = CaptivePortal::new();
    let mut broker = MqttSession::new(&config);
    let mut sink = LogEventSink::new();

    let clock = MonotonicClock::new();
    let watchdog = Watchdog::new();
    let mut crash_log = CrashLog::new();
    crash_log.init(&nvs);

    // ── 5. Application service ────────────────────────────────
    let mut app = AppService::new(config.clone(), config.client_id.clone(), ap_ssid);

    if let Err(e) = app.start(
        clock.uptime_ms(),
        &mut beam,
        &mut wifi,
        &mut portal,
        &nvs,
        &mut sink,
    ) {
        fail_or_log(e, &clock, &mut crash_log, &mut nvs);
    }

    info!("System ready. Entering control loop.");

    // ── 6. Cooperative loop ───────────────────────────────────
    loop {
        esp_idf_hal::delay::FreeRtos::delay_ms(config.poll_interval_ms);
        let now = clock.uptime_ms();

        // Asynchronous edges from the WiFi stack / portal thread.
        let mut deferred: Option<beamgate::Error> = None;
        events::drain_events(|event| match event {
            Event::LinkUp => info!("WiFi event: link up"),
            Event::LinkDown => {
                warn!("WiFi event: link down");
                if let Err(e) = app.note_link_down(now, &mut wifi, &mut portal, &mut nvs) {
                    deferred = Some(e);
                }
            }
            Event::PortalSubmission => info!("Portal event: submission pending"),
        });
        if let Some(e) = deferred {
            fail_or_log(e, &clock, &mut crash_log, &mut nvs);
        }

        if let Err(e) = app.tick(
            now,
            &mut beam,
            &mut wifi,
            &mut portal,
            &mut broker,
            &mut nvs,
            &mut sink,
        ) {
            fail_or_log(e, &clock, &mut crash_log, &mut nvs);
        }

        // Feed watchdog on every iteration.
        watchdog.feed();
    }
}

/// Restart on the one fatal fault (dead portal), log everything else.
fn fail_or_log(
    e: beamgate::Error,
    clock: &MonotonicClock,
    crash_log: &mut CrashLog,
    nvs: &mut NvsAdapter,
) {
    if e.is_fatal() {
        log::error!("FATAL: {} — restarting", e);
        crash_log.write_entry(nvs, &CrashEntry::new(clock.uptime_secs(), "portal died"));
        diagnostics::restart_device();
    }
    warn!("cycle error: {}", e);
}
