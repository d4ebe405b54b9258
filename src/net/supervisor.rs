//! Connectivity supervisor.
//!
//! Owns the association lifecycle as an explicit state machine polled by
//! the cooperative loop — no blocking calls, every transition driven by
//! a timeout or a link status change:
//!
//! ```text
//!            boot, stored creds            join ok
//!  ┌──────────────┐ ───────────▶ (join) ─────────────▶ ┌───────────┐
//!  │ Disconnected │                                    │ Connected │
//!  └──────┬───────┘ ◀──────── link loss (retry budget) └─────┬─────┘
//!         │ window elapsed / no creds                        │ budget
//!         ▼                                                  │ spent
//!  ┌──────────────┐  portal timeout   ┌─────────────────┐    │
//!  │ Provisioning │ ────────────────▶ │ FallbackAttempt │    │
//!  └──────┬───────┘ ◀──────────────── └────────┬────────┘    │
//!         │  submit ok → join          fallback absent/      │
//!         │                            failed (portal then   │
//!         ▼                            waits unbounded)      │
//!      Connected                                             ▼
//!                                                      Provisioning
//! ```
//!
//! The re-opened portal after a failed fallback waits *indefinitely*:
//! a device that cannot get credentials parks for a human instead of
//! power-cycling. The only fatal condition is that portal itself dying.

use log::{info, warn};

use crate::app::ports::{CredentialStore, Credentials, LinkPort, LinkStatus, PortalPort};
use crate::config::SystemConfig;
use crate::error::{Error, PortalError};

// ───────────────────────────────────────────────────────────────
// States
// ───────────────────────────────────────────────────────────────

/// Full connection state with per-state timing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Joining with stored credentials (boot, or auto-reconnect after loss).
    Disconnected {
        deadline_ms: u64,
        retries_left: u8,
    },
    /// Portal open; `join_deadline_ms` is set while a submitted
    /// credential join is in flight. `portal_deadline_ms = None` means
    /// the portal waits indefinitely.
    Provisioning {
        portal_deadline_ms: Option<u64>,
        join_deadline_ms: Option<u64>,
    },
    /// Bounded attempt with the compiled-in fallback credentials.
    FallbackAttempt { deadline_ms: u64 },
    /// Associated; [`NetSupervisor::is_connected`] is true here only.
    Connected,
}

/// State discriminant for events and status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStateKind {
    Disconnected,
    Provisioning,
    FallbackAttempt,
    Connected,
}

impl ConnStateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Provisioning => "provisioning",
            Self::FallbackAttempt => "fallback",
            Self::Connected => "connected",
        }
    }
}

impl From<&ConnState> for ConnStateKind {
    fn from(s: &ConnState) -> Self {
        match s {
            ConnState::Disconnected { .. } => Self::Disconnected,
            ConnState::Provisioning { .. } => Self::Provisioning,
            ConnState::FallbackAttempt { .. } => Self::FallbackAttempt,
            ConnState::Connected => Self::Connected,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

pub struct NetSupervisor {
    state: ConnState,
    cfg: SystemConfig,
    /// Portal AP name, derived from the device MAC.
    ap_ssid: heapless::String<32>,
    /// Credentials for the join currently in flight; persisted on success.
    pending: Option<Credentials>,
    /// Set after a failed fallback: the re-opened portal has no timeout.
    portal_unbounded: bool,
    /// Whether `portal.open()` succeeded for the current provisioning phase.
    portal_started: bool,
}

impl NetSupervisor {
    pub fn new(cfg: SystemConfig, ap_ssid: heapless::String<32>) -> Self {
        Self {
            // Placeholder until `start()`; zero deadline forces an
            // immediate decision on the first poll if start is skipped.
            state: ConnState::Disconnected {
                deadline_ms: 0,
                retries_left: 0,
            },
            cfg,
            ap_ssid,
            pending: None,
            portal_unbounded: false,
            portal_started: false,
        }
    }

    /// Association predicate — reflects supervisor state only, no
    /// reachability probing beyond link status.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnState::Connected)
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn state_kind(&self) -> ConnStateKind {
        ConnStateKind::from(&self.state)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot entry: join the last known network if credentials exist,
    /// otherwise go straight to the portal.
    pub fn start(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
        store: &impl CredentialStore,
    ) -> Result<(), Error> {
        match store.load_credentials() {
            Some(creds) => {
                info!("Net: joining last known network '{}'", creds.ssid);
                match link.begin_join(&creds) {
                    Ok(()) => {
                        self.pending = Some(creds);
                        self.state = ConnState::Disconnected {
                            deadline_ms: now_ms + self.join_window_ms(),
                            retries_left: 0,
                        };
                        Ok(())
                    }
                    Err(e) => {
                        warn!("Net: stored-credential join failed to start — {}", e);
                        self.enter_provisioning(now_ms, link, portal)
                    }
                }
            }
            None => {
                info!("Net: no stored credentials, opening portal");
                self.enter_provisioning(now_ms, link, portal)
            }
        }
    }

    /// Advance the state machine one cycle.
    ///
    /// The only error this can return is the fatal portal death; every
    /// other failure is absorbed into a state transition.
    pub fn poll(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
        store: &mut impl CredentialStore,
    ) -> Result<(), Error> {
        match self.state {
            ConnState::Disconnected {
                deadline_ms,
                retries_left,
            } => {
                if link.status() == LinkStatus::Up {
                    self.commit_connected(link, store);
                } else if now_ms >= deadline_ms {
                    if retries_left > 0 {
                        let attempt = self.cfg.reconnect_retry_budget - retries_left + 1;
                        info!(
                            "Net: reconnect attempt {}/{}",
                            attempt, self.cfg.reconnect_retry_budget
                        );
                        let creds = self.pending.clone().or_else(|| store.load_credentials());
                        match creds {
                            Some(c) if link.begin_join(&c).is_ok() => {
                                self.pending = Some(c);
                                self.state = ConnState::Disconnected {
                                    deadline_ms: now_ms + self.join_window_ms(),
                                    retries_left: retries_left - 1,
                                };
                            }
                            _ => {
                                warn!("Net: reconnect could not start, opening portal");
                                self.enter_provisioning(now_ms, link, portal)?;
                            }
                        }
                    } else {
                        info!("Net: join window elapsed, opening portal");
                        self.enter_provisioning(now_ms, link, portal)?;
                    }
                }
                Ok(())
            }

            ConnState::Provisioning {
                portal_deadline_ms,
                join_deadline_ms,
            } => {
                if let Some(join_deadline) = join_deadline_ms {
                    // A portal-submitted join is in flight.
                    match link.status() {
                        LinkStatus::Up => self.commit_connected(link, store),
                        LinkStatus::Down => {
                            warn!("Net: provisioned join failed, re-opening portal");
                            self.pending = None;
                            self.enter_provisioning(now_ms, link, portal)?;
                        }
                        _ if now_ms >= join_deadline => {
                            warn!("Net: provisioned join timed out, re-opening portal");
                            self.pending = None;
                            self.enter_provisioning(now_ms, link, portal)?;
                        }
                        _ => {}
                    }
                    return Ok(());
                }

                // Portal is (supposed to be) serving.
                if self.portal_started && !portal.is_serving() {
                    // The one unrecoverable fault: an unbounded wait with
                    // nothing to wait on. Caller restarts the device.
                    return Err(PortalError::Died.into());
                }

                if let Some(creds) = portal.take_submission() {
                    info!("Net: portal submission for '{}'", creds.ssid);
                    portal.close();
                    self.portal_started = false;
                    link.exit_ap();
                    match link.begin_join(&creds) {
                        Ok(()) => {
                            self.pending = Some(creds);
                            self.state = ConnState::Provisioning {
                                portal_deadline_ms,
                                join_deadline_ms: Some(now_ms + self.join_window_ms()),
                            };
                        }
                        Err(e) => {
                            warn!("Net: submitted join failed to start — {}", e);
                            self.enter_provisioning(now_ms, link, portal)?;
                        }
                    }
                } else if let Some(deadline) = portal_deadline_ms {
                    if now_ms >= deadline {
                        info!("Net: portal timed out after {}s", self.cfg.portal_timeout_secs);
                        portal.close();
                        self.portal_started = false;
                        link.exit_ap();
                        self.enter_fallback(now_ms, link, portal)?;
                    }
                }
                Ok(())
            }

            ConnState::FallbackAttempt { deadline_ms } => {
                match link.status() {
                    LinkStatus::Up => self.commit_connected(link, store),
                    LinkStatus::Down => {
                        warn!("Net: fallback join failed, portal re-opens without timeout");
                        self.pending = None;
                        self.portal_unbounded = true;
                        self.enter_provisioning(now_ms, link, portal)?;
                    }
                    _ if now_ms >= deadline_ms => {
                        warn!(
                            "Net: fallback join timed out after {}s, portal re-opens without timeout",
                            self.cfg.fallback_timeout_secs
                        );
                        self.pending = None;
                        self.portal_unbounded = true;
                        self.enter_provisioning(now_ms, link, portal)?;
                    }
                    _ => {}
                }
                Ok(())
            }

            ConnState::Connected => {
                if link.status() != LinkStatus::Up {
                    self.begin_reconnect(now_ms, link, portal, store)?;
                }
                Ok(())
            }
        }
    }

    /// Fast path for an asynchronous link-loss notification; equivalent
    /// to the next `poll` noticing the drop, just sooner.
    pub fn note_link_down(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
        store: &mut impl CredentialStore,
    ) -> Result<(), Error> {
        if self.is_connected() {
            self.begin_reconnect(now_ms, link, portal, store)
        } else {
            Ok(())
        }
    }

    // ── Internal transitions ──────────────────────────────────

    fn begin_reconnect(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
        store: &mut impl CredentialStore,
    ) -> Result<(), Error> {
        warn!("Net: link lost, relying on auto-reconnect");
        let creds = self.pending.clone().or_else(|| store.load_credentials());
        match creds {
            Some(c) if link.begin_join(&c).is_ok() => {
                self.pending = Some(c);
                self.state = ConnState::Disconnected {
                    deadline_ms: now_ms + self.join_window_ms(),
                    retries_left: self.cfg.reconnect_retry_budget,
                };
                Ok(())
            }
            _ => {
                warn!("Net: reconnect unavailable, opening portal");
                self.enter_provisioning(now_ms, link, portal)
            }
        }
    }

    fn enter_provisioning(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
    ) -> Result<(), Error> {
        if let Err(e) = link.enter_ap(self.ap_ssid.as_str()) {
            warn!("Net: AP start failed — {}", e);
        }

        let deadline = if self.portal_unbounded {
            None
        } else {
            Some(now_ms + u64::from(self.cfg.portal_timeout_secs) * 1000)
        };

        match portal.open() {
            Ok(()) => {
                self.portal_started = true;
                match deadline {
                    Some(_) => info!(
                        "Net: portal '{}' open ({}s window)",
                        self.ap_ssid, self.cfg.portal_timeout_secs
                    ),
                    None => info!("Net: portal '{}' open (waiting for operator)", self.ap_ssid),
                }
            }
            Err(e) => {
                self.portal_started = false;
                warn!("Net: portal failed to open — {}", e);
                if deadline.is_none() {
                    // Unbounded wait with no portal is a wedge, not a wait.
                    return Err(PortalError::Died.into());
                }
            }
        }

        self.state = ConnState::Provisioning {
            portal_deadline_ms: deadline,
            join_deadline_ms: None,
        };
        Ok(())
    }

    fn enter_fallback(
        &mut self,
        now_ms: u64,
        link: &mut impl LinkPort,
        portal: &mut impl PortalPort,
    ) -> Result<(), Error> {
        if !self.cfg.has_fallback() {
            info!("Net: no fallback credentials, portal re-opens without timeout");
            self.portal_unbounded = true;
            return self.enter_provisioning(now_ms, link, portal);
        }

        let creds = Credentials {
            ssid: self.cfg.fallback_ssid.clone(),
            password: self.cfg.fallback_password.clone(),
        };
        info!(
            "Net: attempting fallback network '{}' ({}s window)",
            creds.ssid, self.cfg.fallback_timeout_secs
        );
        match link.begin_join(&creds) {
            Ok(()) => {
                self.pending = Some(creds);
                self.state = ConnState::FallbackAttempt {
                    deadline_ms: now_ms + u64::from(self.cfg.fallback_timeout_secs) * 1000,
                };
                Ok(())
            }
            Err(e) => {
                warn!("Net: fallback join failed to start — {}", e);
                self.portal_unbounded = true;
                self.enter_provisioning(now_ms, link, portal)
            }
        }
    }

    fn commit_connected(&mut self, link: &impl LinkPort, store: &mut impl CredentialStore) {
        if let Some(creds) = self.pending.take() {
            if let Err(e) = store.store_credentials(&creds) {
                warn!("Net: could not persist credentials — {}", e);
            }
        }
        self.portal_unbounded = false;
        self.state = ConnState::Connected;
        info!("Net: connected (RSSI={:?})", link.rssi());
    }

    fn join_window_ms(&self) -> u64 {
        u64::from(self.cfg.join_timeout_secs) * 1000
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
