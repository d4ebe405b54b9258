//! Publish-only broker client.
//!
//! Sits between the domain and the raw MQTT session
//! ([`BrokerPort`](crate::app::ports::BrokerPort)): owns the topics,
//! serializes events to their wire payloads, and enforces the delivery
//! policy — "at-least-once intended, best-effort actual". A publish
//! that fails (no session, broker rejection) is logged and dropped;
//! the firmware carries no outbound queue, so events attempted during
//! a connectivity gap are lost and never backfilled.
//!
//! The session exists only while the supervisor reports connected and
//! is recreated from scratch on every reconnect.

use log::{info, warn};

use crate::app::events::{HeartbeatEvent, StateChangeEvent, TopicKind};
use crate::app::ports::BrokerPort;
use crate::wire;

pub struct BrokerClient {
    state_topic: heapless::String<64>,
    heartbeat_topic: heapless::String<64>,
    /// Publishes delivered to the session since boot.
    published: u32,
    /// Publishes dropped (no session or rejected) since boot.
    dropped: u32,
}

impl BrokerClient {
    pub fn new(state_topic: heapless::String<64>, heartbeat_topic: heapless::String<64>) -> Self {
        Self {
            state_topic,
            heartbeat_topic,
            published: 0,
            dropped: 0,
        }
    }

    /// Make sure a session is active, opening one if the link allows it.
    ///
    /// Returns `true` only with an active session. When the supervisor
    /// reports disconnected this is an immediate `false` — no broker
    /// action is attempted, and any stale session is torn down so the
    /// next connect starts clean.
    pub fn ensure_connected(&mut self, link_up: bool, port: &mut impl BrokerPort) -> bool {
        if !link_up {
            if port.session_up() {
                info!("Broker: link down, closing session");
                port.close_session();
            }
            return false;
        }

        if port.session_up() {
            return true;
        }

        match port.open_session() {
            Ok(()) => {
                info!("Broker: session opened");
                port.session_up()
            }
            Err(e) => {
                warn!("Broker: session open failed — {}", e);
                false
            }
        }
    }

    /// Publish a confirmed beam transition. Returns `false` on drop.
    pub fn publish_state(&mut self, ev: &StateChangeEvent, port: &mut impl BrokerPort) -> bool {
        let Some(payload) = wire::encode_state(ev) else {
            warn!("Broker: state payload encoding failed, dropping");
            self.dropped += 1;
            return false;
        };
        self.publish(TopicKind::State, &payload, port)
    }

    /// Publish a heartbeat. Returns `false` on drop.
    pub fn publish_heartbeat(&mut self, ev: &HeartbeatEvent, port: &mut impl BrokerPort) -> bool {
        let Some(payload) = wire::encode_heartbeat(ev) else {
            warn!("Broker: heartbeat payload encoding failed, dropping");
            self.dropped += 1;
            return false;
        };
        self.publish(TopicKind::Heartbeat, &payload, port)
    }

    /// Per-cycle housekeeping: session keep-alive, teardown of a session
    /// that outlived its link, and reopening a dropped session as soon
    /// as connectivity is back — the next publish should find it ready.
    pub fn service(&mut self, link_up: bool, port: &mut impl BrokerPort) {
        if !link_up {
            if port.session_up() {
                info!("Broker: link down, closing session");
                port.close_session();
            }
        } else if !port.session_up() {
            // Failures stay quiet here and surface on the publish path;
            // the open is retried every cycle until the link drops.
            if port.open_session().is_ok() && port.session_up() {
                info!("Broker: session opened");
            }
        }
        port.service();
    }

    pub fn published_count(&self) -> u32 {
        self.published
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish(&mut self, kind: TopicKind, payload: &[u8], port: &mut impl BrokerPort) -> bool {
        let topic = match kind {
            TopicKind::State => self.state_topic.as_str(),
            TopicKind::Heartbeat => self.heartbeat_topic.as_str(),
        };

        if !port.session_up() {
            warn!("Broker: no session, dropping publish to '{}'", topic);
            self.dropped += 1;
            return false;
        }

        match port.publish(topic, payload) {
            Ok(()) => {
                self.published += 1;
                true
            }
            Err(e) => {
                warn!("Broker: publish to '{}' failed — {}, dropping", topic, e);
                self.dropped += 1;
                false
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
