//! System configuration parameters
//!
//! All tunable parameters for the CliniPower controller.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::bus::MAX_RETRIES;
use crate::bus::frame::MAX_READ_COUNT;

/// RS-485 link settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    pub baud_rate: u32,
    /// Wait for the first byte of a response.
    pub response_timeout_ms: u32,
    /// Maximum silence between bytes of one response.
    pub inter_byte_timeout_ms: u32,
    /// Extra attempts after a timeout on the command write (0–3).
    pub max_retries: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            response_timeout_ms: 200,
            inter_byte_timeout_ms: 20,
            max_retries: 1,
        }
    }
}

/// Categorical context that does not come from a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub daily_patients: String,
    pub criticality: String,
    pub weather: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            daily_patients: "Medium".into(),
            criticality: "High".into(),
            weather: "Sunny".into(),
        }
    }
}

/// PLC command value written when the model selects `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMapping {
    pub label: String,
    pub value: u16,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,

    // --- Field bus ---
    pub bus: BusConfig,
    /// Slave exposing the alert and status registers.
    pub power_status_slave: u8,
    /// Slave accepting the power-source command.
    pub plc_slave: u8,

    // --- Alerting ---
    pub alert_register: u16,
    /// Alert register value that counts as critical.
    pub alert_critical_value: u16,
    pub alert_message: String,
    /// SMS destination in international format.
    pub alert_phone: String,
    /// Sent once through the alert sink after boot; empty disables it.
    pub boot_message: String,

    // --- Status block (grid, solar, battery, generator) ---
    pub status_register_start: u16,
    pub status_register_count: u16,

    // --- Actuation ---
    pub command_register: u16,
    pub command_map: Vec<CommandMapping>,

    // --- Site ---
    pub site: SiteProfile,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let command = |label: &str, value| CommandMapping {
            label: label.into(),
            value,
        };
        Self {
            control_loop_interval_ms: 5000,

            bus: BusConfig::default(),
            power_status_slave: 1,
            plc_slave: 1,

            alert_register: 0,
            alert_critical_value: 1,
            alert_message: "Critical power failure detected!".into(),
            alert_phone: "+1234567890".into(),
            boot_message: "System booted, power monitoring active.".into(),

            status_register_start: 1,
            status_register_count: 4,

            command_register: 200,
            command_map: vec![
                command("Battery", 1),
                command("Generator", 2),
                command("Grid", 3),
                command("Solar", 4),
            ],

            site: SiteProfile::default(),
        }
    }
}

impl SystemConfig {
    /// Command value for `label`, if mapped.
    pub fn command_for(&self, label: &str) -> Option<u16> {
        self.command_map
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.value)
    }

    /// Range-check every field.  Returns the offending field on failure.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(100..=60_000).contains(&self.control_loop_interval_ms) {
            return Err("control_loop_interval_ms must be 100–60000");
        }
        if !matches!(
            self.bus.baud_rate,
            1200 | 2400 | 4800 | 9600 | 19_200 | 38_400 | 57_600 | 115_200
        ) {
            return Err("bus.baud_rate is not a standard rate");
        }
        if !(10..=2000).contains(&self.bus.response_timeout_ms) {
            return Err("bus.response_timeout_ms must be 10–2000");
        }
        if !(2..=self.bus.response_timeout_ms).contains(&self.bus.inter_byte_timeout_ms) {
            return Err("bus.inter_byte_timeout_ms must be 2–response_timeout_ms");
        }
        if self.bus.max_retries > MAX_RETRIES {
            return Err("bus.max_retries must be 0–3");
        }
        for slave in [self.power_status_slave, self.plc_slave] {
            if !(1..=247).contains(&slave) {
                return Err("slave addresses must be 1–247");
            }
        }
        if !(1..=MAX_READ_COUNT).contains(&self.status_register_count) {
            return Err("status_register_count must be 1–125");
        }
        if self.command_map.is_empty() {
            return Err("command_map must not be empty");
        }
        for (i, m) in self.command_map.iter().enumerate() {
            if self.command_map[..i].iter().any(|prev| prev.label == m.label) {
                return Err("command_map has a duplicate label");
            }
        }
        if self.alert_message.is_empty() || self.alert_message.len() > 160 {
            return Err("alert_message must be 1–160 characters");
        }
        if self.boot_message.len() > 160 {
            return Err("boot_message must be at most 160 characters");
        }
        if self.alert_phone.is_empty() || self.alert_phone.contains('"') {
            return Err("alert_phone is missing or contains a quote");
        }
        Ok(())
    }
}
