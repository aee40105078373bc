//! Unified error types for the CliniPower firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the control
//! loop can tell the three failure classes apart with one `match`:
//!
//! | Class      | Variant            | Effect                                |
//! |------------|--------------------|---------------------------------------|
//! | Fatal      | [`Error::Config`]  | halt before the first tick            |
//! | Transient  | [`Error::Inference`]| abandon this tick, no actuation      |
//! | Transient  | [`Error::Sensor`]  | no decision this tick                 |
//! | Bus        | [`Error::Bus`]     | logged, register unavailable this tick|
//!
//! All variants are `Copy` so they travel through events and reports
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Static tables, model binding or configuration are unusable.
    Config(ConfigFault),
    /// The inference engine failed for this iteration only.
    Inference(InferenceError),
    /// A single field-bus transaction failed.
    Bus(BusError),
    /// A local sensor could not be sampled.
    Sensor(SensorError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl Error {
    /// True for errors that must stop the device.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Init(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Inference(e) => write!(f, "inference: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Fatal configuration faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFault {
    /// Normalization scale at this feature index is zero or not finite.
    ZeroScale(usize),
    /// A per-feature or per-class table has the wrong number of entries.
    TableLength {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    /// A categorical vocabulary has no entries or repeats an entry.
    Vocabulary(&'static str),
    /// Quantization scale is not positive, or zero-point is outside the range.
    Quantization,
    /// Model schema version differs from the one this firmware was built for.
    SchemaVersion { expected: u32, found: u32 },
    /// Model input tensor length differs from the feature vector length.
    InputShape { expected: usize, found: usize },
    /// Model output tensor length differs from the label table length.
    OutputShape { expected: usize, found: usize },
    /// A class label has no bus command mapped to it.
    UnmappedLabel(usize),
    /// The stored model blob could not be decoded.
    ModelBlob,
    /// A configuration field failed range validation.
    Field(&'static str),
}

impl fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroScale(i) => write!(f, "normalization scale[{i}] is zero or not finite"),
            Self::TableLength {
                table,
                expected,
                found,
            } => write!(f, "{table}: expected {expected} entries, found {found}"),
            Self::Vocabulary(name) => write!(f, "vocabulary '{name}' is empty or has duplicates"),
            Self::Quantization => write!(f, "invalid quantization parameters"),
            Self::SchemaVersion { expected, found } => {
                write!(f, "model schema mismatch: expected v{expected}, got v{found}")
            }
            Self::InputShape { expected, found } => {
                write!(f, "model input shape: expected {expected}, got {found}")
            }
            Self::OutputShape { expected, found } => {
                write!(f, "model output shape: expected {expected}, got {found}")
            }
            Self::UnmappedLabel(i) => write!(f, "class {i} has no bus command"),
            Self::ModelBlob => write!(f, "model blob could not be decoded"),
            Self::Field(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<ConfigFault> for Error {
    fn from(e: ConfigFault) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Transient inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    /// The engine reported a failure while running the model.
    InvokeFailed,
    /// Input or output buffer length differs from the bound schema.
    BufferLength,
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvokeFailed => write!(f, "invoke failed"),
            Self::BufferLength => write!(f, "tensor buffer length mismatch"),
        }
    }
}

impl From<InferenceError> for Error {
    fn from(e: InferenceError) -> Self {
        Self::Inference(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The ADC driver rejected a oneshot read on this channel.
    Adc { channel: u32, code: i32 },
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adc { channel, code } => write!(f, "ADC1 channel {channel} read failed ({code})"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Field-bus errors
// ---------------------------------------------------------------------------

/// Outcome of a failed bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No complete response arrived within the response window.
    Timeout,
    /// A response arrived but could not be accepted.
    Protocol(ProtocolError),
    /// The serial channel or direction pin reported an I/O failure.
    Link,
    /// The request itself is not encodable (bad count, broadcast read).
    InvalidRequest,
}

impl BusError {
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "response timeout"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Link => write!(f, "serial link I/O failed"),
            Self::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// CRC-16 of the response does not match its trailer.
    Crc,
    /// Response carries a different slave address than the request.
    WrongSlave,
    /// Response carries a different function code than the request.
    WrongFunction,
    /// Byte count or frame length is inconsistent.
    Malformed,
    /// Slave answered with a Modbus exception code.
    Exception(u8),
    /// Write response does not echo the request.
    EchoMismatch,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crc => write!(f, "CRC mismatch"),
            Self::WrongSlave => write!(f, "unexpected slave address"),
            Self::WrongFunction => write!(f, "unexpected function code"),
            Self::Malformed => write!(f, "malformed frame"),
            Self::Exception(code) => write!(f, "exception 0x{code:02X}"),
            Self::EchoMismatch => write!(f, "write echo mismatch"),
        }
    }
}

impl From<ProtocolError> for BusError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
