//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                  | Connects to              |
//! |-------------|-----------------------------|--------------------------|
//! | `hardware`  | SensorPort                  | Beam receiver GPIO       |
//! | `wifi`      | LinkPort                    | ESP-IDF WiFi STA/AP      |
//! | `portal`    | PortalPort                  | Captive-portal HTTP      |
//! | `mqtt`      | BrokerPort                  | ESP-IDF MQTT client      |
//! | `nvs`       | ConfigPort, StoragePort,    | NVS / in-memory store    |
//! |             | CredentialStore             |                          |
//! | `log_sink`  | EventSink                   | Serial log output        |
//! | `time`      | —                           | ESP32 system timer       |
//! | `device_id` | —                           | eFuse factory MAC        |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod portal;
pub mod time;
pub(super) mod utils;
pub mod wifi;
