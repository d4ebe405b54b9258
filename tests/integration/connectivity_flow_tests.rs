//! Integration tests for the connectivity lifecycle.
//!
//! Drives the full AppService against the simulation adapters:
//! boot join, portal provisioning, the fallback path, the unbounded
//! portal wait, link-loss recovery, and the fatal dead-portal case.

use beamgate::app::ports::PortalPort;
use beamgate::config::SystemConfig;
use beamgate::net::supervisor::ConnStateKind;

use crate::mock_net::{MemStore, Rig};

#[test]
fn boot_with_stored_credentials_connects_without_portal() {
    let mut rig = Rig::new(
        SystemConfig::default(),
        MemStore::with_credentials("HomeNet", "password1"),
    );
    rig.start().unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Disconnected);
    assert_eq!(rig.wifi.sim_joins.len(), 1);

    rig.wifi.sim_complete_join(true);
    rig.tick().unwrap();
    assert!(rig.app.is_connected());
    assert!(
        rig.wifi.sim_ap_active().is_none(),
        "portal AP never came up"
    );
    assert_eq!(
        rig.sink.conn_changes(),
        vec![("disconnected", "connected")]
    );
}

#[test]
fn boot_without_credentials_opens_portal() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.start().unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Provisioning);
    assert_eq!(rig.wifi.sim_ap_active(), Some("beamgate-AABBCC"));
    assert!(rig.portal.is_serving());
}

#[test]
fn portal_provisioning_full_flow() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.connect_via_portal();

    // Credentials were persisted for the next boot.
    let stored = rig.store.creds.clone().unwrap();
    assert_eq!(stored.ssid.as_str(), "TestNet");
    assert!(!rig.portal.is_serving(), "portal closed after provisioning");
    assert!(rig.wifi.sim_ap_active().is_none());
}

#[test]
fn portal_timeout_without_fallback_waits_indefinitely() {
    // 180s portal window, no fallback: the portal re-opens with no
    // deadline and the device parks there — no restart, no panic.
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.start().unwrap();

    rig.run_for_ms(181_000).unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Provisioning);
    assert!(rig.portal.is_serving());

    // A simulated hour of nothing happening.
    rig.run_for_ms(3_600_000).unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Provisioning);
    assert!(!rig.app.is_connected());
}

#[test]
fn portal_timeout_with_fallback_reaches_connected() {
    let mut config = SystemConfig::default();
    config.fallback_ssid.push_str("FactoryNet").unwrap();
    config.fallback_password.push_str("fallback99").unwrap();
    let mut rig = Rig::new(config, MemStore::new());
    rig.start().unwrap();

    rig.run_for_ms(180_010).unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::FallbackAttempt);
    assert_eq!(rig.wifi.sim_joins.last().unwrap().ssid.as_str(), "FactoryNet");

    // Association completes well inside the 20s fallback window.
    rig.wifi.sim_complete_join(true);
    rig.run_for_ms(1_000).unwrap();
    assert!(rig.app.is_connected());
}

#[test]
fn failed_fallback_returns_to_portal() {
    let mut config = SystemConfig::default();
    config.fallback_ssid.push_str("FactoryNet").unwrap();
    config.fallback_password.push_str("fallback99").unwrap();
    let mut rig = Rig::new(config, MemStore::new());
    rig.start().unwrap();

    rig.run_for_ms(180_010).unwrap();
    rig.wifi.sim_complete_join(false);
    rig.run_for_ms(1_000).unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Provisioning);
    assert!(rig.portal.is_serving());

    // The fallback window would have expired long ago; the portal stays.
    rig.run_for_ms(600_000).unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Provisioning);
}

#[test]
fn link_loss_recovers_through_auto_reconnect() {
    let mut rig = Rig::new(
        SystemConfig::default(),
        MemStore::with_credentials("HomeNet", "password1"),
    );
    rig.start().unwrap();
    rig.wifi.sim_complete_join(true);
    rig.tick().unwrap();
    assert!(rig.app.is_connected());

    rig.wifi.sim_drop_link();
    rig.tick().unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Disconnected);

    rig.wifi.sim_complete_join(true);
    rig.tick().unwrap();
    assert!(rig.app.is_connected());
}

#[test]
fn link_loss_escalates_to_portal_after_retry_budget() {
    let config = SystemConfig::default();
    let join_window_ms = u64::from(config.join_timeout_secs) * 1000;
    let budget = u64::from(config.reconnect_retry_budget);

    let mut rig = Rig::new(config, MemStore::with_credentials("HomeNet", "password1"));
    rig.start().unwrap();
    rig.wifi.sim_complete_join(true);
    rig.tick().unwrap();

    rig.wifi.sim_drop_link();
    rig.tick().unwrap();

    // Every join attempt stays stuck until its window elapses.
    rig.run_for_ms((budget + 1) * (join_window_ms + 1_000)).unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Provisioning);
    assert!(rig.portal.is_serving());
}

#[test]
fn dead_portal_is_the_only_fatal_path() {
    let mut rig = Rig::new(SystemConfig::default(), MemStore::new());
    rig.start().unwrap();
    assert!(rig.portal.is_serving());

    rig.portal.sim_kill();
    let err = loop {
        match rig.tick() {
            Ok(()) => {}
            Err(e) => break e,
        }
    };
    assert!(err.is_fatal());
}

#[test]
fn async_link_down_event_is_handled() {
    let mut rig = Rig::new(
        SystemConfig::default(),
        MemStore::with_credentials("HomeNet", "password1"),
    );
    rig.start().unwrap();
    rig.wifi.sim_complete_join(true);
    rig.tick().unwrap();

    // What main() does when Event::LinkDown arrives from the stack.
    rig.wifi.sim_drop_link();
    rig.app
        .note_link_down(rig.now_ms, &mut rig.wifi, &mut rig.portal, &mut rig.store)
        .unwrap();
    assert_eq!(rig.app.conn_state(), ConnStateKind::Disconnected);
}
