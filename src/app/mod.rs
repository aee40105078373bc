//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the control rules for the CliniPower controller:
//! feature preparation, model invocation, decision decoding, command
//! actuation and alert polling.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
