//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, record in tests.
//! Publication to the broker is *not* routed through this sink; the
//! broker client consumes [`StateChangeEvent`]/[`HeartbeatEvent`]
//! directly so that drop-on-failure accounting stays in one place.

use crate::drivers::beam::BeamState;
use crate::net::supervisor::ConnStateKind;

/// Fixed-size device identifier, e.g. `ESP32_Barrier_001` or `BG-AABBCC`.
pub type DeviceId = heapless::String<32>;

/// A confirmed debounced transition, ready for publication.
/// Consumed exactly once; never queued or retried after a failed publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeEvent {
    pub device_id: DeviceId,
    pub state: BeamState,
    pub timestamp_ms: u64,
}

/// Periodic liveness record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatEvent {
    pub device_id: DeviceId,
    pub uptime_ms: u64,
    pub free_heap_bytes: u32,
    pub rssi_dbm: Option<i8>,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started (carries the ground-truth beam state once known).
    Started(Option<BeamState>),

    /// The debouncer committed a transition.
    BeamChanged {
        from: BeamState,
        to: BeamState,
        timestamp_ms: u64,
    },

    /// The connectivity supervisor moved between states.
    ConnectivityChanged {
        from: ConnStateKind,
        to: ConnStateKind,
    },

    /// A publish was dropped (no session, or the broker rejected it).
    PublishDropped { topic_kind: TopicKind },

    /// Periodic status summary (emitted on the heartbeat cadence).
    Status(StatusSummary),
}

/// Which logical topic a publish was bound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    State,
    Heartbeat,
}

/// A point-in-time status snapshot suitable for the diagnostic channel.
#[derive(Debug, Clone)]
pub struct StatusSummary {
    pub conn: ConnStateKind,
    pub session_up: bool,
    pub beam: Option<BeamState>,
    pub uptime_ms: u64,
    pub free_heap_bytes: u32,
    pub rssi_dbm: Option<i8>,
}
