//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART0 / USB-CDC in production).
//! One tagged line per event so the console can be grepped by subsystem.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn reg(v: Option<u16>) -> i32 {
    v.map_or(-1, i32::from)
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { labels } => {
                info!("START | classes={}", labels);
            }
            AppEvent::Decision {
                class,
                label,
                score,
                command,
            } => {
                info!("DECIDE | class={} label={} score={} cmd={}", class, label, score, command);
            }
            AppEvent::CommandWritten {
                slave,
                register,
                value,
            } => {
                info!("BUS | slave={} reg={} <- {}", slave, register, value);
            }
            AppEvent::SensorFault(e) => {
                warn!("SENSE | skipped: {}", e);
            }
            AppEvent::InferenceSkipped(e) => {
                warn!("DECIDE | skipped: {}", e);
            }
            AppEvent::BusFault { op, slave, error } => {
                warn!("BUS | {:?} slave={} failed: {}", op, slave, error);
            }
            AppEvent::AlertRaised { register, value } => {
                warn!("ALERT | reg={} value={} -> operator notified", register, value);
            }
            AppEvent::Status(s) => {
                info!(
                    "STATUS | grid={} solar={} battery={} generator={}",
                    reg(s.grid),
                    reg(s.solar),
                    reg(s.battery),
                    reg(s.generator),
                );
            }
        }
    }
}
