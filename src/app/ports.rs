//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (beam input, WiFi driver, portal server, MQTT client,
//! storage, event sinks) implement these traits. The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly.
//!
//! ## Security notes
//!
//! - **PortalPort** implementations MUST validate credentials at ingress.
//! - **StoragePort** implementations SHOULD encrypt the credential
//!   namespace (ESP32: encrypted NVS partition).
//! - All port errors are typed — callers must handle every variant explicitly.

use crate::config::SystemConfig;
use crate::error::{BrokerError, LinkError, PortalError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per cycle to sample the
/// beam line. Returns the logical level — `true` means the beam is
/// interrupted, with pin polarity already applied by the adapter.
pub trait SensorPort {
    fn read_beam(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// WiFi link port (driven adapter: domain → radio)
// ───────────────────────────────────────────────────────────────

/// Coarse association state reported by the link adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// No join has been requested.
    Idle,
    /// A join is in flight.
    Joining,
    /// Associated with an IP lease.
    Up,
    /// The last join failed or the association dropped.
    Down,
}

/// WiFi credentials as provisioned or stored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Credentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl Credentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, LinkError> {
        let mut s = heapless::String::new();
        s.push_str(ssid).map_err(|()| LinkError::InvalidSsid)?;
        let mut p = heapless::String::new();
        p.push_str(password).map_err(|()| LinkError::InvalidPassword)?;
        Ok(Self { ssid: s, password: p })
    }
}

/// Non-blocking control over the station/AP radio.
///
/// `begin_join` only kicks off an association attempt; the supervisor
/// polls [`status`](LinkPort::status) and applies its own timeouts, so
/// no implementation may block.
pub trait LinkPort {
    /// Start a station-mode join with the given credentials.
    fn begin_join(&mut self, creds: &Credentials) -> Result<(), LinkError>;

    /// Current association state.
    fn status(&self) -> LinkStatus;

    /// Bring up the provisioning access point alongside station mode.
    fn enter_ap(&mut self, ap_ssid: &str) -> Result<(), LinkError>;

    /// Tear the access point back down.
    fn exit_ap(&mut self);

    /// Signal strength of the associated AP, when available.
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Provisioning portal port (driven adapter: operator → domain)
// ───────────────────────────────────────────────────────────────

/// Captive-portal lifecycle. The portal validates submissions itself and
/// only ever hands the domain well-formed credentials.
pub trait PortalPort {
    fn open(&mut self) -> Result<(), PortalError>;
    fn close(&mut self);

    /// Whether the portal is actually serving. `false` while the
    /// supervisor believes it open is the one fatal fault in the system.
    fn is_serving(&self) -> bool;

    /// Take the most recent operator submission, if any.
    fn take_submission(&mut self) -> Option<Credentials>;
}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: domain → MQTT session)
// ───────────────────────────────────────────────────────────────

/// Raw MQTT session control underneath the
/// [`BrokerClient`](crate::net::broker::BrokerClient). One session at a
/// time; a reconnect is a close followed by a fresh open.
pub trait BrokerPort {
    fn open_session(&mut self) -> Result<(), BrokerError>;
    fn close_session(&mut self);
    fn session_up(&self) -> bool;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Per-cycle housekeeping (keep-alive, connection callbacks).
    fn service(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, test
/// recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for credentials and crash logs.
///
/// Keys are namespaced to prevent collisions between subsystems; writes
/// are atomic (the ESP-IDF NVS API guarantees this natively).
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

/// Typed view over the stored last-known WiFi credentials.
pub trait CredentialStore {
    fn load_credentials(&self) -> Option<Credentials>;
    fn store_credentials(&mut self, creds: &Credentials) -> Result<(), StorageError>;
    fn clear_credentials(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from its consumers)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a periodic schedule
/// fires. The [`Scheduler`](crate::scheduler::Scheduler) itself knows
/// nothing about heartbeats or publication.
pub trait SchedulerDelegate {
    /// Called with the label of the schedule that fired.
    fn on_schedule_fired(&mut self, label: &str);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
