//! Unified error types for the BeamGate firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level control loop's error handling uniform.
//! All variants are `Copy` so they can be cheaply passed through the
//! connectivity supervisor without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A WiFi association step failed.
    Link(LinkError),
    /// The provisioning portal failed.
    Portal(PortalError),
    /// The broker session failed.
    Broker(BrokerError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Portal(e) => write!(f, "portal: {e}"),
            Self::Broker(e) => write!(f, "broker: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl Error {
    /// Whether this error has no recovery path other than a device restart.
    ///
    /// The provisioning portal dying while the supervisor is waiting on it
    /// is the only fatal condition: every other failure is retried or
    /// escalated through the supervisor's bounded state machine.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Portal(PortalError::Died))
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No credentials are stored and none were supplied.
    NoCredentials,
    /// SSID failed validation (1-32 printable ASCII bytes).
    InvalidSsid,
    /// Password failed validation (8-64 bytes for WPA2, or empty for open).
    InvalidPassword,
    /// The driver rejected the join request.
    JoinFailed,
    /// AP-mode reconfiguration failed.
    ApFailed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::JoinFailed => write!(f, "WiFi join failed"),
            Self::ApFailed => write!(f, "AP mode start failed"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Portal errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalError {
    /// HTTP server failed to start.
    ServerStart,
    /// The portal stopped serving while the supervisor was waiting on it.
    /// No recovery path exists — the device restarts.
    Died,
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerStart => write!(f, "portal HTTP server failed to start"),
            Self::Died => write!(f, "portal stopped serving unexpectedly"),
        }
    }
}

impl From<PortalError> for Error {
    fn from(e: PortalError) -> Self {
        Self::Portal(e)
    }
}

// ---------------------------------------------------------------------------
// Broker errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// Session could not be opened.
    ConnectFailed,
    /// Publish attempted without an active session.
    SessionClosed,
    /// The broker rejected or dropped the publish.
    PublishRejected,
    /// Broker host/port/client-id configuration is unusable.
    BadConfig,
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "broker connect failed"),
            Self::SessionClosed => write!(f, "broker session not active"),
            Self::PublishRejected => write!(f, "publish rejected"),
            Self::BadConfig => write!(f, "broker configuration invalid"),
        }
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        Self::Broker(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_portal_death_is_fatal() {
        assert!(Error::Portal(PortalError::Died).is_fatal());
        assert!(!Error::Portal(PortalError::ServerStart).is_fatal());
        assert!(!Error::Link(LinkError::JoinFailed).is_fatal());
        assert!(!Error::Broker(BrokerError::ConnectFailed).is_fatal());
    }
}
