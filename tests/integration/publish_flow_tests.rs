//! Integration tests for the sensor → broker publication path.
//!
//! Exercises debounced transitions end-to-end: payload contract on the
//! wire, drop-on-failure semantics across session gaps, heartbeat
//! cadence, and the no-duplicate guarantee.

use beamgate::app::ports::BrokerPort;
use beamgate::config::SystemConfig;
use beamgate::wire::{HeartbeatPayload, StatePayload, WireState};

use crate::mock_net::{MemStore, Rig};

const STATE_TOPIC: &str = "sensors/barrier/state";
const HEARTBEAT_TOPIC: &str = "sensors/barrier/heartbeat";

fn state_payloads(rig: &Rig) -> Vec<StatePayload> {
    rig.broker
        .sim_published
        .iter()
        .filter(|(topic, _)| topic == STATE_TOPIC)
        .map(|(_, bytes)| serde_json::from_slice(bytes).unwrap())
        .collect()
}

fn heartbeat_payloads(rig: &Rig) -> Vec<HeartbeatPayload> {
    rig.broker
        .sim_published
        .iter()
        .filter(|(topic, _)| topic == HEARTBEAT_TOPIC)
        .map(|(_, bytes)| serde_json::from_slice(bytes).unwrap())
        .collect()
}

#[test]
fn confirmed_interruption_publishes_contract_payload() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.connect_via_portal();

    rig.beam.sim_set_interrupted(true);
    rig.run_for_ms(100).unwrap();

    let payloads = state_payloads(&rig);
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].id.as_str(), "ESP32_Barrier_001");
    assert_eq!(payloads[0].state, WireState::Ocupada);

    // Raw JSON field spelling is part of the backend contract.
    let raw = std::str::from_utf8(&rig.broker.sim_published[0].1).unwrap();
    assert!(raw.contains(r#""state":"ocupada""#));
    assert!(raw.contains(r#""timestamp_ms":"#));
}

#[test]
fn full_gate_pass_publishes_both_edges_once() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.connect_via_portal();

    // Product enters the beam for 200ms, then clears.
    rig.beam.sim_set_interrupted(true);
    rig.run_for_ms(200).unwrap();
    rig.beam.sim_set_interrupted(false);
    rig.run_for_ms(200).unwrap();

    let payloads = state_payloads(&rig);
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].state, WireState::Ocupada);
    assert_eq!(payloads[1].state, WireState::Livre);
    assert_eq!(
        rig.sink.beam_changes(),
        vec![
            ("clear".to_string(), "interrupted".to_string()),
            ("interrupted".to_string(), "clear".to_string()),
        ]
    );
}

#[test]
fn flicker_shorter_than_debounce_publishes_nothing() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.connect_via_portal();

    // Three 20ms blips — all inside the 50ms settle window.
    for _ in 0..3 {
        rig.beam.sim_set_interrupted(true);
        rig.run_for_ms(20).unwrap();
        rig.beam.sim_set_interrupted(false);
        rig.run_for_ms(20).unwrap();
    }
    rig.run_for_ms(200).unwrap();

    assert!(state_payloads(&rig).is_empty());
    assert!(rig.sink.beam_changes().is_empty());
}

#[test]
fn no_two_publishes_share_state_and_timestamp() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.connect_via_portal();

    for _ in 0..5 {
        rig.beam.sim_set_interrupted(true);
        rig.run_for_ms(150).unwrap();
        rig.beam.sim_set_interrupted(false);
        rig.run_for_ms(150).unwrap();
    }

    let payloads = state_payloads(&rig);
    assert_eq!(payloads.len(), 10);
    let mut seen = std::collections::HashSet::new();
    for p in &payloads {
        assert!(
            seen.insert((p.state, p.timestamp_ms)),
            "duplicate (state, timestamp_ms) pair published"
        );
    }
}

#[test]
fn session_gap_drops_events_without_backfill() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.connect_via_portal();

    // First transition delivered normally.
    rig.beam.sim_set_interrupted(true);
    rig.run_for_ms(100).unwrap();
    assert_eq!(state_payloads(&rig).len(), 1);

    // Broker session drops and refuses to reopen: events in the gap
    // are reported as failures and dropped.
    rig.broker.sim_refuse_open(true);
    rig.broker.sim_drop_session();

    rig.beam.sim_set_interrupted(false);
    rig.run_for_ms(100).unwrap();
    rig.beam.sim_set_interrupted(true);
    rig.run_for_ms(100).unwrap();

    assert_eq!(state_payloads(&rig).len(), 1, "gap events not delivered");
    assert_eq!(rig.app.publishes_dropped(), 2);
    assert_eq!(rig.sink.dropped_publishes(), 2);

    // Session comes back: only NEW transitions are published.
    rig.broker.sim_refuse_open(false);
    rig.beam.sim_set_interrupted(false);
    rig.run_for_ms(100).unwrap();

    let payloads = state_payloads(&rig);
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1].state, WireState::Livre);
}

#[test]
fn disconnected_device_drops_states_without_broker_action() {
    // Never connected: publishes fail immediately, nothing reaches the
    // session, and the device keeps running.
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.start().unwrap();

    rig.beam.sim_set_interrupted(true);
    rig.run_for_ms(100).unwrap();

    assert!(rig.broker.sim_published.is_empty());
    assert_eq!(rig.app.publishes_dropped(), 1);
    assert_eq!(rig.sink.dropped_publishes(), 1);
}

#[test]
fn heartbeat_fires_on_interval_with_status_report() {
    let mut config = SystemConfig::default();
    config.heartbeat_interval_secs = 5;
    let mut rig = Rig::new(config, MemStore::new());
    rig.connect_via_portal();

    rig.run_for_ms(11_000).unwrap();

    let beats = heartbeat_payloads(&rig);
    assert_eq!(beats.len(), 2);
    assert_eq!(beats[0].id.as_str(), "ESP32_Barrier_001");
    assert!(beats[0].free_heap_bytes > 0);
    assert!(beats[1].uptime_ms > beats[0].uptime_ms);
    assert_eq!(rig.sink.status_reports(), 2);
}

#[test]
fn heartbeat_reopens_session_after_gap() {
    let mut config = SystemConfig::default();
    config.heartbeat_interval_secs = 5;
    let mut rig = Rig::new(config, MemStore::new());
    rig.connect_via_portal();

    rig.broker.sim_drop_session();
    rig.run_for_ms(6_000).unwrap();

    // ensure_connected reopened the session for the heartbeat.
    assert!(!heartbeat_payloads(&rig).is_empty());
    assert!(rig.broker.session_up());
}
