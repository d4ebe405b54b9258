//! Crash logging and runtime diagnostics.
//!
//! Stores up to 4 crash entries in an NVS ring buffer under the "crash"
//! namespace. Each entry captures uptime and a truncated reason string.
//! A custom panic handler writes the entry before the TWDT or panic
//! handler triggers a reset, and the supervisor's portal-death restart
//! records one the same way.
//!
//! Free-heap queries back the heartbeat payload and the periodic status
//! line.

use serde::{Deserialize, Serialize};

use crate::app::events::StatusSummary;

const CRASH_RING_SLOTS: usize = 4;
const CRASH_NAMESPACE: &str = "crash";
const CRASH_INDEX_KEY: &str = "crash_idx";

// ───────────────────────────────────────────────────────────────
// Free heap
// ───────────────────────────────────────────────────────────────

/// Bytes currently free on the heap.
#[cfg(target_os = "espidf")]
pub fn free_heap_bytes() -> u32 {
    unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
}

/// Simulation: a realistic constant so host tests exercise the same
/// payload paths as hardware.
#[cfg(not(target_os = "espidf"))]
pub fn free_heap_bytes() -> u32 {
    204_800
}

// ───────────────────────────────────────────────────────────────
// Status summary rendering
// ───────────────────────────────────────────────────────────────

/// Render a status summary as a single diagnostic line.
pub fn format_status(s: &StatusSummary) -> String {
    let beam = match s.beam {
        Some(b) => b.to_string(),
        None => "unknown".to_string(),
    };
    format!(
        "conn={} session={} beam={} heap={}B uptime={}s rssi={}",
        s.conn.as_str(),
        if s.session_up { "up" } else { "down" },
        beam,
        s.free_heap_bytes,
        s.uptime_ms / 1000,
        s.rssi_dbm.map_or("n/a".to_string(), |r| format!("{}dBm", r)),
    )
}

// ───────────────────────────────────────────────────────────────
// Crash log
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashEntry {
    pub uptime_secs: u64,
    pub reason: heapless::String<64>,
}

impl CrashEntry {
    pub fn new(uptime_secs: u64, reason: &str) -> Self {
        let mut r = heapless::String::new();
        let _ = r.push_str(&reason[..reason.len().min(63)]);
        Self {
            uptime_secs,
            reason: r,
        }
    }
}

/// NVS-backed ring buffer for crash entries.
#[derive(Default)]
pub struct CrashLog {
    write_index: usize,
}

impl CrashLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the write index from NVS, or default to 0.
    pub fn init(&mut self, nvs: &dyn crate::app::ports::StoragePort) {
        let mut buf = [0u8; 4];
        if let Ok(4) = nvs.read(CRASH_NAMESPACE, CRASH_INDEX_KEY, &mut buf) {
            self.write_index = u32::from_le_bytes(buf) as usize % CRASH_RING_SLOTS;
        }
    }

    /// Write a crash entry to the next ring slot and advance the index.
    pub fn write_entry(
        &mut self,
        nvs: &mut dyn crate::app::ports::StoragePort,
        entry: &CrashEntry,
    ) {
        let slot_key = Self::slot_key(self.write_index);
        if let Ok(bytes) = postcard::to_allocvec(entry) {
            let _ = nvs.write(CRASH_NAMESPACE, &slot_key, &bytes);
        }

        self.write_index = (self.write_index + 1) % CRASH_RING_SLOTS;
        let idx_bytes = (self.write_index as u32).to_le_bytes();
        let _ = nvs.write(CRASH_NAMESPACE, CRASH_INDEX_KEY, &idx_bytes);
    }

    /// Read all stored crash entries (up to 4).
    pub fn read_all(
        &self,
        nvs: &dyn crate::app::ports::StoragePort,
    ) -> heapless::Vec<CrashEntry, 4> {
        let mut entries = heapless::Vec::new();
        for i in 0..CRASH_RING_SLOTS {
            let slot_key = Self::slot_key(i);
            let mut buf = [0u8; 128];
            if let Ok(len) = nvs.read(CRASH_NAMESPACE, &slot_key, &mut buf) {
                if let Ok(entry) = postcard::from_bytes::<CrashEntry>(&buf[..len]) {
                    let _ = entries.push(entry);
                }
            }
        }
        entries
    }

    /// Erase all crash entries and reset the index.
    pub fn clear(&mut self, nvs: &mut dyn crate::app::ports::StoragePort) {
        for i in 0..CRASH_RING_SLOTS {
            let slot_key = Self::slot_key(i);
            let _ = nvs.delete(CRASH_NAMESPACE, &slot_key);
        }
        let _ = nvs.delete(CRASH_NAMESPACE, CRASH_INDEX_KEY);
        self.write_index = 0;
    }

    pub fn count(&self, nvs: &dyn crate::app::ports::StoragePort) -> usize {
        (0..CRASH_RING_SLOTS)
            .filter(|i| nvs.exists(CRASH_NAMESPACE, &Self::slot_key(*i)))
            .count()
    }

    fn slot_key(index: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("e{}", index));
        s
    }
}

// ───────────────────────────────────────────────────────────────
// Panic handler and restart
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that logs the panic reason before the default
/// handler aborts (and the TWDT resets the device).
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        log::error!("PANIC: {}", reason);
    }));
}

/// Restart the device. The caller is expected to have written a
/// [`CrashEntry`] first — this does not return.
#[cfg(target_os = "espidf")]
pub fn restart_device() -> ! {
    log::error!("Restarting device");
    unsafe { esp_idf_svc::sys::esp_restart() };
    unreachable!()
}

#[cfg(not(target_os = "espidf"))]
pub fn restart_device() -> ! {
    panic!("device restart requested");
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
