//! Break-beam debouncer.
//!
//! ## Hardware
//!
//! Photoelectric receiver with open-collector output to GND and the
//! internal pull-up enabled: the line reads LOW while the beam is
//! interrupted. The main loop samples the pin at poll cadence and feeds
//! the logical level into [`BeamDebouncer::poll`].
//!
//! ## Algorithm
//!
//! Confirm-then-commit: a raw level change only arms a candidate and
//! resets the settle clock; the candidate is committed once the raw
//! level has held unchanged for the full debounce delay *and* differs
//! from the current stable state. The delay therefore measures time
//! since the last raw edge, so a flicker burst that keeps toggling
//! inside the window never reaches stable state.
//!
//! The very first sample is taken as immediate ground truth and is
//! never reported as a transition.

use core::fmt;

/// Debounced beam state as seen by the rest of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamState {
    /// Beam path is unobstructed.
    Clear,
    /// Something is blocking the beam.
    Interrupted,
}

impl BeamState {
    fn from_interrupted(interrupted: bool) -> Self {
        if interrupted {
            Self::Interrupted
        } else {
            Self::Clear
        }
    }
}

impl fmt::Display for BeamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => write!(f, "clear"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// A confirmed stable-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamTransition {
    pub from: BeamState,
    pub to: BeamState,
    /// Poll timestamp at which the change was committed.
    pub at_ms: u64,
}

/// Map a raw pin level to the logical "beam interrupted" predicate.
///
/// `active_low = true` means the receiver pulls the line LOW while the
/// beam is blocked (the usual open-collector wiring).
pub fn beam_interrupted(raw_high: bool, active_low: bool) -> bool {
    raw_high != active_low
}

/// Time-hysteresis debouncer over the logical beam level.
pub struct BeamDebouncer {
    delay_ms: u32,
    /// Most recent raw sample (candidate level).
    last_raw: Option<bool>,
    /// Committed stable level.
    last_stable: Option<bool>,
    /// Timestamp of the last raw edge.
    last_edge_ms: u64,
}

impl BeamDebouncer {
    pub fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms,
            last_raw: None,
            last_stable: None,
            last_edge_ms: 0,
        }
    }

    /// Feed one logical sample (`true` = beam interrupted).
    ///
    /// Returns a transition only when the sample has held steady for the
    /// full debounce delay and differs from the committed stable state.
    pub fn poll(&mut self, interrupted: bool, now_ms: u64) -> Option<BeamTransition> {
        let (Some(last_raw), Some(last_stable)) = (self.last_raw, self.last_stable) else {
            // Boot-time ground truth: seed both levels, report nothing.
            self.last_raw = Some(interrupted);
            self.last_stable = Some(interrupted);
            self.last_edge_ms = now_ms;
            return None;
        };

        if interrupted != last_raw {
            // New candidate — restart the settle clock.
            self.last_raw = Some(interrupted);
            self.last_edge_ms = now_ms;
            return None;
        }

        if interrupted != last_stable && now_ms.saturating_sub(self.last_edge_ms) >= u64::from(self.delay_ms) {
            self.last_stable = Some(interrupted);
            return Some(BeamTransition {
                from: BeamState::from_interrupted(last_stable),
                to: BeamState::from_interrupted(interrupted),
                at_ms: now_ms,
            });
        }

        None
    }

    /// Committed stable state, `None` before the first sample.
    pub fn stable(&self) -> Option<BeamState> {
        self.last_stable.map(BeamState::from_interrupted)
    }
}
