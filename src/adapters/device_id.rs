//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable, human-readable device ID in the form `BG-XXYYZZ`
//! (last 3 bytes of the 6-byte MAC in uppercase hex). This ID is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - The basis for the provisioning AP name (`beamgate-XXYYZZ`), which
//!   keeps co-located unconfigured units distinguishable with zero
//!   configuration
//!
//! The MQTT client identifier is configured separately — it is part of
//! the backend wire contract, not derived here.

/// Fixed-size device ID string: "BG-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the short device ID from the last 3 MAC bytes.
/// Format: `BG-XXYYZZ` (e.g., `BG-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    use core::fmt::Write;
    let _ = write!(id, "BG-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Derive the provisioning AP name from the last 3 MAC bytes.
/// Format: `beamgate-XXYYZZ` (matches the label on the enclosure).
pub fn ap_ssid(mac: &MacAddress) -> heapless::String<32> {
    let mut name = heapless::String::<32>::new();
    use core::fmt::Write;
    let _ = write!(name, "beamgate-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    name
}
