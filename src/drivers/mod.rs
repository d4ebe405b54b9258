//! Sensor-line drivers and peripheral helpers.

pub mod beam;
pub mod watchdog;
