//! Periodic-task engine.
//!
//! Drives the time-based work of the cooperative loop (heartbeat and
//! status reporting) without the loop itself carrying interval
//! bookkeeping. When a schedule fires, the engine notifies a
//! [`SchedulerDelegate`] rather than acting directly — that keeps the
//! engine independently testable and ignorant of publication.
//!
//! ```text
//! ┌────────────┐   tick(tick_secs)   ┌───────────────────┐
//! │ Main loop  │────────────────────▶│ Scheduler          │
//! └────────────┘                     │  "heartbeat" 60s   │
//!        ▲                           └─────────┬─────────┘
//!        │     on_schedule_fired("heartbeat")  │
//!        └─────────────────────────────────────┘
//! ```

use crate::app::ports::SchedulerDelegate;
use log::info;

/// A single periodic schedule entry.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Human-readable label (e.g., "heartbeat").
    pub label: &'static str,
    /// Fire every `interval_secs` seconds.
    pub interval_secs: u32,
    /// Whether this schedule is currently enabled.
    pub enabled: bool,
}

/// Maximum number of concurrent schedules (stack-allocated).
const MAX_SCHEDULES: usize = 4;

/// Internal bookkeeping for a live schedule.
#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// Ticks elapsed since last fire.
    elapsed_ticks: u64,
}

/// The periodic-task engine.
pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
    /// Global enable flag.
    enabled: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: [None, None, None, None],
            enabled: true,
        }
    }

    /// Add a schedule. Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule) -> Option<usize> {
        for (i, slot) in self.schedules.iter_mut().enumerate() {
            if slot.is_none() {
                info!("Scheduler: added '{}' at slot {}", schedule.label, i);
                *slot = Some(ScheduleEntry {
                    schedule,
                    elapsed_ticks: 0,
                });
                return Some(i);
            }
        }
        None // All slots full.
    }

    /// Remove a schedule by slot index.
    pub fn remove(&mut self, slot: usize) {
        if slot < MAX_SCHEDULES {
            if let Some(entry) = &self.schedules[slot] {
                info!("Scheduler: removed '{}' from slot {}", entry.schedule.label, slot);
            }
            self.schedules[slot] = None;
        }
    }

    /// Enable or disable the entire scheduler.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Tick the scheduler. Call once per loop cycle.
    ///
    /// * `tick_secs` — duration of one cycle in seconds.
    /// * `delegate` — receives fire notifications.
    pub fn tick(&mut self, tick_secs: f32, delegate: &mut dyn SchedulerDelegate) {
        if !self.enabled {
            return;
        }

        for slot in self.schedules.iter_mut() {
            let entry = match slot {
                Some(e) if e.schedule.enabled => e,
                _ => continue,
            };

            entry.elapsed_ticks += 1;
            let elapsed_secs = entry.elapsed_ticks as f32 * tick_secs;

            if elapsed_secs >= entry.schedule.interval_secs as f32 {
                delegate.on_schedule_fired(entry.schedule.label);
                entry.elapsed_ticks = 0;
            }
        }
    }

    /// Number of active (enabled) schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .filter(|s| s.as_ref().is_some_and(|e| e.schedule.enabled))
            .count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
