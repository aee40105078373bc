//! Mock hardware for integration tests.
//!
//! [`SimBus`] is a serial link with Modbus RTU slaves behind it: every
//! request written to it is decoded, answered from a per-slave register
//! bank and queued for the master to read back.  The remaining mocks
//! record calls so tests can assert on the full history.

use std::collections::HashMap;
use std::convert::Infallible;

use clinipower::app::events::AppEvent;
use clinipower::app::ports::{AlertSink, EventSink, SensorPort, SensorReading};
use clinipower::bus::SerialLink;
use clinipower::bus::frame::{FN_READ_HOLDING_REGISTERS, FN_WRITE_SINGLE_REGISTER, crc16};
use clinipower::error::{InferenceError, SensorError};
use clinipower::inference::{InferenceEngine, ModelSchema};
use embedded_hal::digital::{ErrorType, OutputPin};

const ILLEGAL_DATA_ADDRESS: u8 = 0x02;

// ── SimBus ────────────────────────────────────────────────────

fn with_crc(mut frame: Vec<u8>) -> Vec<u8> {
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

#[derive(Default)]
pub struct SimBus {
    /// slave → (address → value)
    banks: HashMap<u8, HashMap<u16, u16>>,
    request: Vec<u8>,
    rx: Vec<u8>,
    /// Every complete request frame seen, in order.
    pub requests: Vec<Vec<u8>>,
    /// Read windows the master asked for.
    pub windows: Vec<u32>,
}

#[allow(dead_code)]
impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a slave holding `regs` starting at address 0.
    pub fn with_slave(mut self, slave: u8, regs: &[(u16, u16)]) -> Self {
        self.banks.insert(slave, regs.iter().copied().collect());
        self
    }

    pub fn register(&self, slave: u8, address: u16) -> Option<u16> {
        self.banks.get(&slave)?.get(&address).copied()
    }

    pub fn set_register(&mut self, slave: u8, address: u16, value: u16) {
        self.banks.entry(slave).or_default().insert(address, value);
    }

    fn answer(&mut self, frame: &[u8]) {
        if frame.len() != 8 || crc16(&frame[..6]).to_le_bytes() != [frame[6], frame[7]] {
            return;
        }
        let slave = frame[0];
        let function = frame[1];
        let address = u16::from_be_bytes([frame[2], frame[3]]);
        let operand = u16::from_be_bytes([frame[4], frame[5]]);
        let Some(bank) = self.banks.get_mut(&slave) else {
            return;
        };

        let reply = match function {
            FN_READ_HOLDING_REGISTERS => {
                let values: Option<Vec<u16>> =
                    (0..operand).map(|i| bank.get(&address.wrapping_add(i)).copied()).collect();
                match values {
                    Some(values) => {
                        let mut out = vec![slave, function, (values.len() * 2) as u8];
                        for v in values {
                            out.extend_from_slice(&v.to_be_bytes());
                        }
                        out
                    }
                    None => vec![slave, function | 0x80, ILLEGAL_DATA_ADDRESS],
                }
            }
            FN_WRITE_SINGLE_REGISTER => {
                bank.insert(address, operand);
                frame[..6].to_vec()
            }
            _ => return,
        };
        self.rx = with_crc(reply);
    }
}

impl SerialLink for SimBus {
    type Error = Infallible;

    fn write(&mut self, data: &[u8]) -> Result<usize, Infallible> {
        self.request.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        let frame = std::mem::take(&mut self.request);
        self.answer(&frame);
        self.requests.push(frame);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Infallible> {
        self.windows.push(timeout_ms);
        let n = buf.len().min(self.rx.len());
        buf[..n].copy_from_slice(&self.rx[..n]);
        self.rx.drain(..n);
        Ok(n)
    }

    fn discard_input(&mut self) -> Result<(), Infallible> {
        self.rx.clear();
        Ok(())
    }
}

// ── Direction pin ─────────────────────────────────────────────

#[derive(Default)]
pub struct DirectionPin {
    pub edges: Vec<bool>,
}

#[allow(dead_code)]
impl DirectionPin {
    pub fn is_high(&self) -> bool {
        self.edges.last().copied().unwrap_or(false)
    }
}

impl ErrorType for DirectionPin {
    type Error = Infallible;
}

impl OutputPin for DirectionPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.edges.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.edges.push(true);
        Ok(())
    }
}

// ── Sensors ───────────────────────────────────────────────────

pub struct FixedSensors(pub Result<SensorReading, SensorError>);

#[allow(dead_code)]
impl FixedSensors {
    /// Morning, grid up, mid-range readings.
    pub fn morning() -> Self {
        Self(Ok(SensorReading {
            battery_level: 75.0,
            temperature_c: 32.0,
            voltage_v: 230.0,
            current_a: 5.2,
            grid_available: true,
            hour: Some(9),
        }))
    }

    /// Every read fails with an ADC driver error.
    pub fn faulty(channel: u32) -> Self {
        Self(Err(SensorError::Adc { channel, code: -1 }))
    }
}

impl SensorPort for FixedSensors {
    fn read(&mut self) -> Result<SensorReading, SensorError> {
        self.0
    }
}

// ── Inference ─────────────────────────────────────────────────

/// Engine returning fixed scores and recording every input it sees.
pub struct StubEngine {
    pub schema: ModelSchema,
    pub scores: Vec<i8>,
    pub fail: bool,
    pub inputs: Vec<Vec<i8>>,
}

#[allow(dead_code)]
impl StubEngine {
    pub fn new(classes: usize, scores: &[i8]) -> Self {
        Self {
            schema: ModelSchema::expected(classes),
            scores: scores.to_vec(),
            fail: false,
            inputs: Vec::new(),
        }
    }

    pub fn failing(classes: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(classes, &vec![0; classes])
        }
    }
}

impl InferenceEngine for StubEngine {
    fn schema(&self) -> ModelSchema {
        self.schema
    }

    fn invoke(&mut self, input: &[i8], output: &mut [i8]) -> Result<(), InferenceError> {
        self.inputs.push(input.to_vec());
        if self.fail {
            return Err(InferenceError::InvokeFailed);
        }
        output.copy_from_slice(&self.scores);
        Ok(())
    }
}

// ── Alerts and events ─────────────────────────────────────────

#[derive(Default)]
pub struct AlertLog {
    pub sent: Vec<String>,
}

impl AlertSink for AlertLog {
    fn send_alert(&mut self, message: &str) {
        self.sent.push(message.to_string());
    }
}

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
