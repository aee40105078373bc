//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, forward to
//! an uplink, record in a test.

use crate::error::{BusError, InferenceError, SensorError};

/// Which bus step of the control loop failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    WriteCommand,
    ReadAlert,
    ReadStatus,
}

/// Status block published by the power-status slave.
///
/// Fields are `None` when the configured block is shorter than the
/// register they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerStatus {
    pub grid: Option<u16>,
    pub solar: Option<u16>,
    pub battery: Option<u16>,
    pub generator: Option<u16>,
}

impl PowerStatus {
    /// Map a register block (grid, solar, battery, generator order).
    pub fn from_registers(regs: &[u16]) -> Self {
        Self {
            grid: regs.first().copied(),
            solar: regs.get(1).copied(),
            battery: regs.get(2).copied(),
            generator: regs.get(3).copied(),
        }
    }
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The control service has started.
    Started { labels: usize },

    /// The classifier selected a power source.
    Decision {
        class: usize,
        label: String,
        score: i8,
        command: u16,
    },

    /// The PLC acknowledged the command write.
    CommandWritten { slave: u8, register: u16, value: u16 },

    /// The sensors could not be sampled; no decision this tick.
    SensorFault(SensorError),

    /// Inference failed; no actuation this tick.
    InferenceSkipped(InferenceError),

    /// A bus transaction failed; the tick continues.
    BusFault { op: BusOp, slave: u8, error: BusError },

    /// The alert register read critical and the alert sink was triggered.
    AlertRaised { register: u16, value: u16 },

    /// Periodic status block poll.
    Status(PowerStatus),
}
