//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (sensors, field bus, alert channel, event sinks,
//! storage) implement these traits.  The
//! [`ControlService`](super::service::ControlService) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **AlertSink** is fire-and-forget: delivery failures stay inside the
//!   adapter and are never reported back to the control loop.
//! - All other port errors are typed; callers handle every variant.

use embedded_hal::digital::OutputPin;

use crate::bus::frame::Registers;
use crate::bus::{BusMaster, SerialLink};
use crate::config::SystemConfig;
use crate::error::{BusError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One sample of every locally measured input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Battery state of charge (%).
    pub battery_level: f32,
    pub temperature_c: f32,
    pub voltage_v: f32,
    pub current_a: f32,
    /// Mains sense input.
    pub grid_available: bool,
    /// Local wall-clock hour (0–23), `None` before the clock is set.
    pub hour: Option<u8>,
}

/// Read-side port: the domain calls this to obtain sensor data.
///
/// A failed read yields no reading at all; the domain never decides on
/// a partial sample.
pub trait SensorPort {
    fn read(&mut self) -> Result<SensorReading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Field bus port (driven adapter: domain ↔ remote slaves)
// ───────────────────────────────────────────────────────────────

/// Register access on the shared RS-485 bus.
///
/// Each call is exactly one request/response exchange; retry policy
/// belongs to the caller.
pub trait FieldBus {
    fn read_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> Result<Registers, BusError>;

    fn write_register(&mut self, slave: u8, address: u16, value: u16) -> Result<(), BusError>;
}

impl<L: SerialLink, P: OutputPin> FieldBus for BusMaster<L, P> {
    fn read_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> Result<Registers, BusError> {
        self.read_holding_registers(slave, address, count)
    }

    fn write_register(&mut self, slave: u8, address: u16, value: u16) -> Result<(), BusError> {
        self.write_single_register(slave, address, value)
    }
}

// ───────────────────────────────────────────────────────────────
// Alert port (driven adapter: domain → SMS / operator)
// ───────────────────────────────────────────────────────────────

/// Short text notification to an operator.
pub trait AlertSink {
    fn send_alert(&mut self, message: &str);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, uplink,
/// test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting and
/// after loading.  Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the config record and the model blob.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Writes MUST be atomic: no partial writes on power loss.  The ESP-IDF
///   NVS API guarantees this natively; the in-memory simulation achieves
///   it trivially.
pub trait StoragePort {
    /// Read a whole value.
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a value atomically.
    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}
impl core::error::Error for StorageError {}
