//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the adapters' simulation backends. All tests run on the host
//! (x86_64) with no real hardware required.

mod connectivity_flow_tests;
mod mock_net;
mod publish_flow_tests;
