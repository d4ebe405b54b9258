//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the debouncer, the connectivity supervisor, the
//! broker client, and the periodic scheduler, and runs one cooperative
//! cycle per [`tick`](AppService::tick). All I/O flows through port
//! traits injected at call sites, making the entire service testable
//! with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌───────────────────────────────┐ ──▶ EventSink
//!  LinkPort   ──▶ │          AppService           │
//!  PortalPort ──▶ │ Debounce · Supervise · Publish│ ──▶ BrokerPort
//!  Storage    ──▶ └───────────────────────────────┘
//! ```
//!
//! Cycle order is fixed: broker housekeeping and supervisor poll first,
//! then the sensor path, then time-based work — a confirmed transition
//! always sees the freshest connectivity verdict.

use log::info;

use crate::config::SystemConfig;
use crate::diagnostics;
use crate::drivers::beam::{BeamDebouncer, BeamState};
use crate::net::broker::BrokerClient;
use crate::net::supervisor::{ConnStateKind, NetSupervisor};
use crate::scheduler::{Schedule, Scheduler};

use super::events::{
    AppEvent, DeviceId, HeartbeatEvent, StateChangeEvent, StatusSummary, TopicKind,
};
use super::ports::{
    BrokerPort, CredentialStore, EventSink, LinkPort, PortalPort, SchedulerDelegate, SensorPort,
};

const HEARTBEAT_LABEL: &str = "heartbeat";

/// Collects schedule fires within a single cycle.
#[derive(Default)]
struct FiredSchedules {
    heartbeat: bool,
}

impl SchedulerDelegate for FiredSchedules {
    fn on_schedule_fired(&mut self, label: &str) {
        if label == HEARTBEAT_LABEL {
            self.heartbeat = true;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    device_id: DeviceId,
    debouncer: BeamDebouncer,
    supervisor: NetSupervisor,
    broker: BrokerClient,
    scheduler: Scheduler,
    /// Seconds per cycle (derived from config).
    tick_secs: f32,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from configuration and device identity.
    ///
    /// Does **not** start connectivity — call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, device_id: DeviceId, ap_ssid: heapless::String<32>) -> Self {
        let tick_secs = config.poll_interval_ms as f32 / 1000.0;
        let debouncer = BeamDebouncer::new(config.debounce_delay_ms);
        let broker = BrokerClient::new(config.state_topic.clone(), config.heartbeat_topic.clone());

        let mut scheduler = Scheduler::new();
        scheduler.add(Schedule {
            label: HEARTBEAT_LABEL,
            interval_secs: config.heartbeat_interval_secs,
            enabled: true,
        });

        let supervisor = NetSupervisor::new(config, ap_ssid);

        Self {
            device_id,
            debouncer,
            supervisor,
            broker,
            scheduler,
            tick_secs,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot: take the sensor's ground-truth reading, then bring up
    /// connectivity (stored credentials or portal).
    pub fn start(
        &mut self,
        now_ms: u64,
        sensor: &mut impl SensorPort,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
        store: &impl CredentialStore,
        sink: &mut impl EventSink,
    ) -> crate::error::Result<()> {
        // First sample seeds the debouncer; never reported as a transition.
        let interrupted = sensor.read_beam();
        self.debouncer.poll(interrupted, now_ms);

        self.supervisor.start(now_ms, link, portal, store)?;
        sink.emit(&AppEvent::Started(self.debouncer.stable()));
        info!("AppService started, beam={:?}", self.debouncer.stable());
        Ok(())
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full cycle: connectivity → sensor → publication → timers.
    ///
    /// The only error that escapes is the fatal portal death; the caller
    /// records a crash entry and restarts.
    pub fn tick(
        &mut self,
        now_ms: u64,
        sensor: &mut impl SensorPort,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
        broker_port: &mut impl BrokerPort,
        store: &mut impl CredentialStore,
        sink: &mut impl EventSink,
    ) -> crate::error::Result<()> {
        self.tick_count += 1;

        // 1. Broker housekeeping + connectivity supervision.
        self.broker
            .service(self.supervisor.is_connected(), broker_port);

        let prev_conn = self.supervisor.state_kind();
        self.supervisor.poll(now_ms, link, portal, store)?;
        let conn = self.supervisor.state_kind();
        if conn != prev_conn {
            sink.emit(&AppEvent::ConnectivityChanged {
                from: prev_conn,
                to: conn,
            });
        }

        // 2. Sensor path: confirmed transitions are published once and
        //    never retried (no outbound queue by design).
        let interrupted = sensor.read_beam();
        if let Some(tr) = self.debouncer.poll(interrupted, now_ms) {
            sink.emit(&AppEvent::BeamChanged {
                from: tr.from,
                to: tr.to,
                timestamp_ms: tr.at_ms,
            });

            let event = StateChangeEvent {
                device_id: self.device_id.clone(),
                state: tr.to,
                timestamp_ms: tr.at_ms,
            };
            // Best-effort session; the publish itself decides and
            // accounts for the drop.
            self.broker
                .ensure_connected(self.supervisor.is_connected(), broker_port);
            let delivered = self.broker.publish_state(&event, broker_port);
            if !delivered {
                sink.emit(&AppEvent::PublishDropped {
                    topic_kind: TopicKind::State,
                });
            }
        }

        // 3. Time-based work.
        let mut fired = FiredSchedules::default();
        self.scheduler.tick(self.tick_secs, &mut fired);
        if fired.heartbeat {
            self.publish_heartbeat(now_ms, link, broker_port, sink);
        }

        Ok(())
    }

    /// Fast path for an asynchronous link-loss event from the WiFi stack.
    pub fn note_link_down(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
        store: &mut impl CredentialStore,
    ) -> crate::error::Result<()> {
        self.supervisor.note_link_down(now_ms, link, portal, store)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.supervisor.is_connected()
    }

    pub fn conn_state(&self) -> ConnStateKind {
        self.supervisor.state_kind()
    }

    pub fn beam_state(&self) -> Option<BeamState> {
        self.debouncer.stable()
    }

    /// Total cycles executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn publishes_dropped(&self) -> u32 {
        self.broker.dropped_count()
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish_heartbeat(
        &mut self,
        now_ms: u64,
        link: &impl LinkPort,
        broker_port: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) {
        let heartbeat = HeartbeatEvent {
            device_id: self.device_id.clone(),
            uptime_ms: now_ms,
            free_heap_bytes: diagnostics::free_heap_bytes(),
            rssi_dbm: link.rssi(),
        };
        self.broker
            .ensure_connected(self.supervisor.is_connected(), broker_port);
        let delivered = self.broker.publish_heartbeat(&heartbeat, broker_port);
        if !delivered {
            sink.emit(&AppEvent::PublishDropped {
                topic_kind: TopicKind::Heartbeat,
            });
        }

        sink.emit(&AppEvent::Status(StatusSummary {
            conn: self.supervisor.state_kind(),
            session_up: broker_port.session_up(),
            beam: self.debouncer.stable(),
            uptime_ms: now_ms,
            free_heap_bytes: heartbeat.free_heap_bytes,
            rssi_dbm: heartbeat.rssi_dbm,
        }));
    }
}
