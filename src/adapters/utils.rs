//! Shared utilities for adapter-layer validation.
//!
//! These helpers are used by the portal and WiFi adapters and are
//! centralised here to avoid duplication.

use crate::error::LinkError;

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
///
/// Used to validate WiFi SSID strings and portal-provisioned credentials.
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// SSID rules: 1-32 printable ASCII bytes.
pub(super) fn validate_ssid(ssid: &str) -> Result<(), LinkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(LinkError::InvalidSsid);
    }
    Ok(())
}

/// Password rules: empty (open network) or 8-64 bytes for WPA2.
pub(super) fn validate_password(password: &str) -> Result<(), LinkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(LinkError::InvalidPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_ascii_accepts_normal_strings() {
        assert!(is_printable_ascii("HomeNetwork"));
        assert!(is_printable_ascii("MySSID-2.4GHz"));
        assert!(is_printable_ascii("P@$$w0rd!"));
    }

    #[test]
    fn printable_ascii_rejects_control_chars() {
        assert!(!is_printable_ascii("bad\x00ssid"));
        assert!(!is_printable_ascii("tab\there"));
        assert!(!is_printable_ascii("newline\nhere"));
    }

    #[test]
    fn printable_ascii_rejects_high_bytes() {
        assert!(!is_printable_ascii("caf\u{e9}"));
    }

    #[test]
    fn ssid_bounds() {
        assert!(validate_ssid("HomeNet").is_ok());
        assert!(validate_ssid("").is_err());
        assert!(validate_ssid(&"x".repeat(33)).is_err());
    }

    #[test]
    fn password_bounds() {
        assert!(validate_password("").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("justright8").is_ok());
        assert!(validate_password(&"x".repeat(65)).is_err());
    }
}
