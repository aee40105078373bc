//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                  |
//! |------------|-------------------|------------------------------|
//! | `gsm`      | AlertSink         | SIM800 modem over UART2      |
//! | `log_sink` | EventSink         | Serial log output            |
//! | `nvs`      | ConfigPort        | NVS / in-memory store        |
//! |            | StoragePort       |                              |
//! | `time`     | -                 | ESP32 system timer, RTC      |
//! | `uart`     | SerialLink        | ESP-IDF UART driver          |
//!
//! `SensorPort` is implemented by [`SensorHub`](crate::sensors::SensorHub)
//! and `FieldBus` by [`BusMaster`](crate::bus::BusMaster).

pub mod gsm;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod uart;
