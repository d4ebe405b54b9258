//! Network domain logic: connectivity supervision and broker publication.
//!
//! Both modules are pure state machines over the port traits in
//! [`crate::app::ports`] — the WiFi radio, portal server, and MQTT
//! session are injected at call sites, so every flow here runs on the
//! host under test.

pub mod broker;
pub mod supervisor;
