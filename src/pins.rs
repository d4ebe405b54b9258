//! GPIO pin assignments for the BeamGate sensor board.
//!
//! Single source of truth — adapters reference this module rather than
//! hard-coding pin numbers.

/// Break-beam receiver output. Simple open-collector contact to GND,
/// so the pin runs with the internal pull-up enabled and reads LOW
/// while the beam is interrupted.
pub const BEAM_GPIO: i32 = 27;
