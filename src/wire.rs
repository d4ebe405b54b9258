//! MQTT wire payloads.
//!
//! Field names and the two state literals are a fixed contract with the
//! backend ingestion service — the subscriber keys its counting logic on
//! `"ocupada"` → `"livre"` transitions, so they must never change shape.
//!
//! State topic: `{"id": "...", "state": "livre"|"ocupada", "timestamp_ms": N}`
//! Heartbeat topic: `{"id": "...", "uptime_ms": N, "free_heap_bytes": N, "rssi_dbm": N}`

use serde::{Deserialize, Serialize};

use crate::app::events::{HeartbeatEvent, StateChangeEvent};
use crate::drivers::beam::BeamState;

/// Beam state as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireState {
    #[serde(rename = "livre")]
    Livre,
    #[serde(rename = "ocupada")]
    Ocupada,
}

impl From<BeamState> for WireState {
    fn from(state: BeamState) -> Self {
        match state {
            BeamState::Clear => Self::Livre,
            BeamState::Interrupted => Self::Ocupada,
        }
    }
}

impl From<WireState> for BeamState {
    fn from(state: WireState) -> Self {
        match state {
            WireState::Livre => Self::Clear,
            WireState::Ocupada => Self::Interrupted,
        }
    }
}

/// State-topic payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    pub id: heapless::String<32>,
    pub state: WireState,
    pub timestamp_ms: u64,
}

impl From<&StateChangeEvent> for StatePayload {
    fn from(ev: &StateChangeEvent) -> Self {
        Self {
            id: ev.device_id.clone(),
            state: ev.state.into(),
            timestamp_ms: ev.timestamp_ms,
        }
    }
}

/// Heartbeat-topic payload. Downstream treats everything beyond `id` as
/// an opaque liveness blob, never as a source of truth for counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub id: heapless::String<32>,
    pub uptime_ms: u64,
    pub free_heap_bytes: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rssi_dbm: Option<i8>,
}

impl From<&HeartbeatEvent> for HeartbeatPayload {
    fn from(ev: &HeartbeatEvent) -> Self {
        Self {
            id: ev.device_id.clone(),
            uptime_ms: ev.uptime_ms,
            free_heap_bytes: ev.free_heap_bytes,
            rssi_dbm: ev.rssi_dbm,
        }
    }
}

/// Serialize a state event to its wire bytes.
pub fn encode_state(ev: &StateChangeEvent) -> Option<Vec<u8>> {
    serde_json::to_vec(&StatePayload::from(ev)).ok()
}

/// Serialize a heartbeat event to its wire bytes.
pub fn encode_heartbeat(ev: &HeartbeatEvent) -> Option<Vec<u8>> {
    serde_json::to_vec(&HeartbeatPayload::from(ev)).ok()
}
