//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! This is the diagnostic channel — none of these events reach the end
//! user directly.

use log::{info, warn};

use crate::app::events::{AppEvent, TopicKind};
use crate::app::ports::EventSink;
use crate::diagnostics;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(beam) => match beam {
                Some(b) => info!("START | beam={}", b),
                None => info!("START | beam=unknown"),
            },
            AppEvent::BeamChanged {
                from,
                to,
                timestamp_ms,
            } => {
                info!("BEAM  | {} -> {} @{}ms", from, to, timestamp_ms);
            }
            AppEvent::ConnectivityChanged { from, to } => {
                info!("CONN  | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::PublishDropped { topic_kind } => {
                let kind = match topic_kind {
                    TopicKind::State => "state",
                    TopicKind::Heartbeat => "heartbeat",
                };
                warn!("DROP  | {} publish lost", kind);
            }
            AppEvent::Status(s) => {
                info!("STAT  | {}", diagnostics::format_status(s));
            }
        }
    }
}
