//! CliniPower firmware library.
//!
//! Exposes the pure-logic modules (feature pipeline, inference boundary,
//! Modbus RTU master, control service) for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod features;
pub mod inference;
pub mod pins;
pub mod tables;

pub mod adapters;
pub mod drivers;
pub mod sensors;

pub use error::{Error, Result};
