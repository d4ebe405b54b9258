//! Beam input adapter — bridges the receiver GPIO to [`SensorPort`].
//!
//! This is the only module in the system that touches the sensor pin.
//! Pull mode and polarity come from configuration; the rest of the
//! system only ever sees the logical "beam interrupted" level.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real GPIO reads via `esp_idf_hal`.
//! - **all other targets**: a settable simulated line level for
//!   host-side tests.

use crate::app::ports::SensorPort;
use crate::drivers::beam::beam_interrupted;

#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};

pub struct BeamInput {
    active_low: bool,
    #[cfg(target_os = "espidf")]
    pin: PinDriver<'static, AnyIOPin, Input>,
    /// Simulation: raw line level as driven by the test.
    #[cfg(not(target_os = "espidf"))]
    sim_level_high: bool,
}

#[cfg(target_os = "espidf")]
impl BeamInput {
    /// Configure the receiver pin as an input with the requested pull.
    pub fn new(pin: AnyIOPin, pull_up: bool, active_low: bool) -> crate::error::Result<Self> {
        let mut pin =
            PinDriver::input(pin).map_err(|_| crate::error::Error::Init("beam pin"))?;
        let pull = if pull_up { Pull::Up } else { Pull::Floating };
        pin.set_pull(pull)
            .map_err(|_| crate::error::Error::Init("beam pin pull"))?;
        Ok(Self { active_low, pin })
    }
}

#[cfg(not(target_os = "espidf"))]
impl BeamInput {
    pub fn new(active_low: bool) -> Self {
        Self {
            active_low,
            // Pull-up keeps the line HIGH while nothing blocks the beam.
            sim_level_high: active_low,
        }
    }

    /// Drive the simulated raw line level (true = HIGH).
    pub fn sim_set_level(&mut self, high: bool) {
        self.sim_level_high = high;
    }

    /// Drive the simulated *logical* beam state.
    pub fn sim_set_interrupted(&mut self, interrupted: bool) {
        self.sim_level_high = interrupted != self.active_low;
    }
}

impl SensorPort for BeamInput {
    fn read_beam(&mut self) -> bool {
        #[cfg(target_os = "espidf")]
        let raw_high = {
            use embedded_hal::digital::InputPin;
            // A failed read keeps the line at its pulled level rather
            // than fabricating an interruption.
            self.pin.is_high().unwrap_or(self.active_low)
        };

        #[cfg(not(target_os = "espidf"))]
        let raw_high = self.sim_level_high;

        beam_interrupted(raw_high, self.active_low)
    }
}
