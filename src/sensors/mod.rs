//! Sensor subsystem: the aggregating [`SensorHub`].
//!
//! The hub converts the four analog front-end channels to engineering
//! units, samples the grid-sense input and asks the clock for the hour.
//! It implements [`SensorPort`] directly.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by hw_init).
//! On host/test: reads the injectable simulation state in `hw_init`.

use crate::adapters::time::Esp32TimeAdapter;
use crate::app::ports::{SensorPort, SensorReading};
use crate::drivers::hw_init::{self, ADC_MAX};
use crate::error::SensorError;
use crate::pins;

/// Linear mapping from a raw 12-bit count to an engineering value:
/// `value = raw / 4095 * span + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCalibration {
    pub span: f32,
    pub offset: f32,
}

impl LinearCalibration {
    pub const fn new(span: f32, offset: f32) -> Self {
        Self { span, offset }
    }

    pub fn apply(&self, raw: u16) -> f32 {
        f32::from(raw) / f32::from(ADC_MAX) * self.span + self.offset
    }
}

/// Calibration for every analog channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogCalibration {
    /// 0–100 % state of charge.
    pub battery: LinearCalibration,
    /// °C.
    pub temperature: LinearCalibration,
    /// RMS volts.
    pub voltage: LinearCalibration,
    /// Amps, bidirectional around mid-scale.
    pub current: LinearCalibration,
}

impl Default for AnalogCalibration {
    fn default() -> Self {
        Self {
            battery: LinearCalibration::new(100.0, 0.0),
            temperature: LinearCalibration::new(150.0, 0.0),
            voltage: LinearCalibration::new(300.0, 0.0),
            current: LinearCalibration::new(60.0, -30.0),
        }
    }
}

/// Aggregates the analog channels, grid sense and clock.
pub struct SensorHub {
    calibration: AnalogCalibration,
    clock: Esp32TimeAdapter,
    grid_sense_gpio: i32,
}

impl SensorHub {
    pub fn new(calibration: AnalogCalibration, clock: Esp32TimeAdapter) -> Self {
        Self {
            calibration,
            clock,
            grid_sense_gpio: pins::GRID_SENSE_GPIO,
        }
    }
}

impl SensorPort for SensorHub {
    fn read(&mut self) -> Result<SensorReading, SensorError> {
        let cal = &self.calibration;
        let battery = cal.battery.apply(hw_init::adc1_read(hw_init::ADC1_CH_BATTERY)?);
        Ok(SensorReading {
            battery_level: battery.clamp(0.0, 100.0),
            temperature_c: cal.temperature.apply(hw_init::adc1_read(hw_init::ADC1_CH_TEMP)?),
            voltage_v: cal.voltage.apply(hw_init::adc1_read(hw_init::ADC1_CH_VOLTAGE)?),
            current_a: cal.current.apply(hw_init::adc1_read(hw_init::ADC1_CH_CURRENT)?),
            grid_available: hw_init::gpio_read(self.grid_sense_gpio),
            hour: self.clock.current_hour(),
        })
    }
}
