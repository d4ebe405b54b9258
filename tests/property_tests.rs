//! Property and fuzz-style tests for the core state machines.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use beamgate::app::ports::{
    CredentialStore, Credentials, LinkPort, LinkStatus, PortalPort, StorageError,
};
use beamgate::config::SystemConfig;
use beamgate::drivers::beam::{BeamDebouncer, BeamState};
use beamgate::net::supervisor::{ConnStateKind, NetSupervisor};
use proptest::prelude::*;

const DELAY_MS: u32 = 50;
const SAMPLE_MS: u64 = 5;

/// Feed a level/hold-duration script into a fresh debouncer, sampling
/// every `SAMPLE_MS`, and collect the committed transitions.
fn run_debouncer(segments: &[(bool, u64)]) -> Vec<(BeamState, BeamState, u64)> {
    let mut d = BeamDebouncer::new(DELAY_MS);
    let mut now = 0u64;
    let mut out = vec![];
    for (level, hold_ms) in segments {
        let end = now + hold_ms;
        while now < end {
            if let Some(tr) = d.poll(*level, now) {
                out.push((tr.from, tr.to, tr.at_ms));
            }
            now += SAMPLE_MS;
        }
    }
    out
}

/// Alternating levels, every hold shorter than the debounce delay.
fn arb_flicker() -> impl Strategy<Value = Vec<(bool, u64)>> {
    proptest::collection::vec(1u64..u64::from(DELAY_MS) - SAMPLE_MS, 2..40).prop_map(|holds| {
        holds
            .into_iter()
            .enumerate()
            .map(|(i, hold)| (i % 2 == 1, hold))
            .collect()
    })
}

/// Arbitrary level script with holds both above and below the delay.
fn arb_script() -> impl Strategy<Value = Vec<(bool, u64)>> {
    proptest::collection::vec((any::<bool>(), 1u64..300), 1..40)
}

proptest! {
    /// A signal that never holds one level for the full delay commits
    /// nothing: every flicker burst is invisible downstream.
    #[test]
    fn flicker_bursts_never_commit(segments in arb_flicker()) {
        let transitions = run_debouncer(&segments);
        prop_assert!(
            transitions.is_empty(),
            "burst shorter than the delay produced {:?}",
            transitions
        );
    }

    /// Holding the final level long enough commits at most one
    /// transition; repeating it forever commits nothing further.
    #[test]
    fn repeated_samples_are_idempotent(mut segments in arb_script()) {
        // Pin the tail: final level held far beyond the delay.
        let last = segments.last().map_or(false, |(level, _)| *level);
        segments.push((last, 10 * u64::from(DELAY_MS)));

        let mut d = BeamDebouncer::new(DELAY_MS);
        let mut now = 0u64;
        for (level, hold_ms) in &segments {
            let end = now + hold_ms;
            while now < end {
                d.poll(*level, now);
                now += SAMPLE_MS;
            }
        }
        let settled = d.stable();

        // A settled debouncer stays silent on identical input.
        for _ in 0..200 {
            prop_assert_eq!(d.poll(last, now), None);
            now += SAMPLE_MS;
        }
        prop_assert_eq!(d.stable(), settled);
    }

    /// Transitions always chain: each starts from the previous stable
    /// state, flips the level, and carries a strictly increasing
    /// timestamp — so no two share a `(state, timestamp)` pair.
    #[test]
    fn transitions_chain_without_duplicates(segments in arb_script()) {
        let transitions = run_debouncer(&segments);

        let mut last_to: Option<BeamState> = None;
        let mut last_at = 0u64;
        for (from, to, at_ms) in &transitions {
            prop_assert_ne!(from, to);
            if let Some(prev) = last_to {
                prop_assert_eq!(*from, prev);
                prop_assert!(*at_ms > last_at);
            }
            last_to = Some(*to);
            last_at = *at_ms;
        }
    }

    /// A commit requires the level to have held for at least the delay:
    /// each reported transition is preceded by a quiet window.
    #[test]
    fn commits_only_after_full_hold(segments in arb_script()) {
        let mut d = BeamDebouncer::new(DELAY_MS);
        let mut now = 0u64;
        let mut last_edge = 0u64;
        let mut last_level: Option<bool> = None;

        for (level, hold_ms) in &segments {
            let end = now + hold_ms;
            while now < end {
                if last_level != Some(*level) {
                    last_edge = now;
                    last_level = Some(*level);
                }
                if let Some(tr) = d.poll(*level, now) {
                    prop_assert!(
                        tr.at_ms - last_edge >= u64::from(DELAY_MS),
                        "commit at {} only {}ms after edge",
                        tr.at_ms,
                        tr.at_ms - last_edge
                    );
                }
                now += SAMPLE_MS;
            }
        }
    }
}

// ── Supervisor random walk ────────────────────────────────────

#[derive(Debug, Clone)]
enum NetOp {
    /// Advance time by this many milliseconds and poll.
    Advance(u64),
    /// Resolve the in-flight join (success/failure).
    JoinResult(bool),
    /// Drop an established link.
    DropLink,
    /// Operator submits portal credentials.
    Submit,
}

fn arb_net_op() -> impl Strategy<Value = NetOp> {
    prop_oneof![
        (1u64..40_000).prop_map(NetOp::Advance),
        any::<bool>().prop_map(NetOp::JoinResult),
        Just(NetOp::DropLink),
        Just(NetOp::Submit),
    ]
}

struct WalkLink {
    status: LinkStatus,
}

impl LinkPort for WalkLink {
    fn begin_join(&mut self, _creds: &Credentials) -> Result<(), beamgate::LinkError> {
        self.status = LinkStatus::Joining;
        Ok(())
    }
    fn status(&self) -> LinkStatus {
        self.status
    }
    fn enter_ap(&mut self, _ap_ssid: &str) -> Result<(), beamgate::LinkError> {
        Ok(())
    }
    fn exit_ap(&mut self) {}
    fn rssi(&self) -> Option<i8> {
        None
    }
}

struct WalkPortal {
    open: bool,
    submission: Option<Credentials>,
}

impl PortalPort for WalkPortal {
    fn open(&mut self) -> Result<(), beamgate::PortalError> {
        self.open = true;
        Ok(())
    }
    fn close(&mut self) {
        self.open = false;
        self.submission = None;
    }
    fn is_serving(&self) -> bool {
        self.open
    }
    fn take_submission(&mut self) -> Option<Credentials> {
        self.submission.take()
    }
}

struct WalkStore {
    creds: Option<Credentials>,
}

impl CredentialStore for WalkStore {
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

proptest! {
    /// However events interleave, the supervisor stays inside its four
    /// states, never dies (the portal here never does), and reports
    /// `is_connected` exactly in the Connected state.
    #[test]
    fn supervisor_never_wedges(
        boot_creds in any::<bool>(),
        ops in proptest::collection::vec(arb_net_op(), 1..60),
    ) {
        let mut ap = heapless::String::new();
        ap.push_str("beamgate-AABBCC").unwrap();
        let mut sup = NetSupervisor::new(SystemConfig::default(), ap);

        let mut link = WalkLink { status: LinkStatus::Idle };
        let mut portal = WalkPortal { open: false, submission: None };
        let mut store = WalkStore {
            creds: boot_creds.then(|| Credentials::new("BootNet", "password1").unwrap()),
        };

        let mut now = 0u64;
        sup.start(now, &mut link, &mut portal, &store).unwrap();

        for op in ops {
            match op {
                NetOp::Advance(ms) => now += ms,
                NetOp::JoinResult(success) => {
                    if link.status == LinkStatus::Joining {
                        link.status = if success { LinkStatus::Up } else { LinkStatus::Down };
                    }
                }
                NetOp::DropLink => {
                    if link.status == LinkStatus::Up {
                        link.status = LinkStatus::Down;
                    }
                }
                NetOp::Submit => {
                    if portal.open {
                        portal.submission =
                            Some(Credentials::new("OpNet", "password1").unwrap());
                    }
                }
            }

            sup.poll(now, &mut link, &mut portal, &mut store).unwrap();

            let kind = sup.state_kind();
            prop_assert!(matches!(
                kind,
                ConnStateKind::Disconnected
                    | ConnStateKind::Provisioning
                    | ConnStateKind::FallbackAttempt
                    | ConnStateKind::Connected
            ));
            prop_assert_eq!(sup.is_connected(), kind == ConnStateKind::Connected);
        }
    }
}
