//! Control service: the hexagonal core.
//!
//! [`ControlService`] owns the feature pipeline, the label table and the
//! label → command mapping.  Hardware handles live in a [`DeviceContext`]
//! owned by the top-level loop and lent to [`ControlService::tick`], so
//! the service is testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │        ControlService         │
//!    FieldBus ◀──▶│ features · model · decode     │ ──▶ AlertSink
//!                 └──────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::bus::retry_on_timeout;
use crate::config::SystemConfig;
use crate::error::{ConfigFault, InferenceError};
use crate::features::{FeaturePipeline, PowerInputs, PreparedFeatures};
use crate::inference::decoder::LabelTable;
use crate::inference::{self, BoundModel, InferenceEngine, ModelSchema, SCHEMA_VERSION};
use crate::tables::DeploymentTables;

use super::events::{AppEvent, BusOp, PowerStatus};
use super::ports::{AlertSink, EventSink, FieldBus, SensorPort, SensorReading};

// ───────────────────────────────────────────────────────────────
// Device context
// ───────────────────────────────────────────────────────────────

/// Every hardware-backed collaborator of the control loop.
pub struct DeviceContext<S, E, B, A> {
    pub sensors: S,
    pub model: BoundModel<E>,
    pub bus: B,
    pub alerts: A,
}

// ───────────────────────────────────────────────────────────────
// Tick report
// ───────────────────────────────────────────────────────────────

/// Summary of one control-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Prepared model input, `None` when the sensors could not be read.
    pub features: Option<PreparedFeatures>,
    /// Winning class, `None` when inference was skipped.
    pub class: Option<usize>,
    /// Command value chosen for the winning class.
    pub command: Option<u16>,
    pub command_written: bool,
    /// Alert register value, `None` when the read failed.
    pub alert_value: Option<u16>,
    pub alert_raised: bool,
    pub status: Option<PowerStatus>,
    pub bus_faults: u8,
}

/// Category for the wall-clock hour.  An unset clock yields an empty
/// string, which encodes as the unknown category.
pub fn time_of_day(hour: Option<u8>) -> &'static str {
    match hour {
        Some(5..=11) => "Morning",
        Some(12..=17) => "Afternoon",
        Some(0..=4 | 18..=23) => "Night",
        _ => "",
    }
}

fn grid_status(available: bool) -> &'static str {
    if available { "Available" } else { "Unavailable" }
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

/// The control service orchestrates one classification and actuation
/// cycle per tick.
pub struct ControlService {
    config: SystemConfig,
    pipeline: FeaturePipeline,
    labels: LabelTable,
    /// Command value per class index.
    commands: Vec<u16>,
    tick_count: u64,
}

impl ControlService {
    /// Validate configuration and tables together.  Every failure here is
    /// fatal: the loop must not start.
    pub fn new(config: SystemConfig, tables: &DeploymentTables) -> Result<Self, ConfigFault> {
        config.validate().map_err(ConfigFault::Field)?;
        if tables.schema_version != SCHEMA_VERSION {
            return Err(ConfigFault::SchemaVersion {
                expected: SCHEMA_VERSION,
                found: tables.schema_version,
            });
        }
        let pipeline = FeaturePipeline::from_tables(tables)?;
        let labels = LabelTable::new(&tables.labels)?;
        let commands = labels
            .iter()
            .enumerate()
            .map(|(i, label)| config.command_for(label).ok_or(ConfigFault::UnmappedLabel(i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            pipeline,
            labels,
            commands,
            tick_count: 0,
        })
    }

    /// Schema the model must declare for these tables.
    pub fn expected_schema(&self) -> ModelSchema {
        ModelSchema::expected(self.labels.len())
    }

    /// Check `engine` against [`expected_schema`](Self::expected_schema).
    pub fn bind_model<E: InferenceEngine>(&self, engine: E) -> Result<BoundModel<E>, ConfigFault> {
        inference::bind(engine, self.expected_schema())
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce startup and send the boot notification.
    pub fn start(&mut self, alerts: &mut impl AlertSink, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            labels: self.labels.len(),
        });
        if !self.config.boot_message.is_empty() {
            alerts.send_alert(&self.config.boot_message);
        }
        info!(
            "ControlService started: {} classes, tick {} ms",
            self.labels.len(),
            self.config.control_loop_interval_ms
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle:
    /// sensors → features → infer → decode → command write → alert → status.
    ///
    /// A sensor fault skips the decision; the alert and status polls still
    /// run.  Bus failures are reported as events and never abort the tick.
    pub fn tick<S, E, B, A>(
        &mut self,
        ctx: &mut DeviceContext<S, E, B, A>,
        sink: &mut impl EventSink,
    ) -> TickReport
    where
        S: SensorPort,
        E: InferenceEngine,
        B: FieldBus,
        A: AlertSink,
    {
        self.tick_count += 1;

        let mut report = TickReport {
            tick: self.tick_count,
            features: None,
            class: None,
            command: None,
            command_written: false,
            alert_value: None,
            alert_raised: false,
            status: None,
            bus_faults: 0,
        };

        // 1–2. Sensors and feature preparation
        match ctx.sensors.read() {
            Ok(reading) => {
                let features = self.prepare(&reading);
                debug!("features q={:?}", features.quantized);
                report.features = Some(features);

                // 3–5. Inference, decision, actuation
                self.decide_and_actuate(ctx, &features, &mut report, sink);
            }
            Err(e) => {
                warn!("sensor read failed: {}", e);
                sink.emit(&AppEvent::SensorFault(e));
            }
        }

        // 6. Alert register
        let status_slave = self.config.power_status_slave;
        match ctx.bus.read_registers(status_slave, self.config.alert_register, 1) {
            Ok(regs) => {
                let value = regs.first().copied().unwrap_or_default();
                report.alert_value = Some(value);
                if value == self.config.alert_critical_value {
                    warn!("alert register {} = {}", self.config.alert_register, value);
                    ctx.alerts.send_alert(&self.config.alert_message);
                    report.alert_raised = true;
                    sink.emit(&AppEvent::AlertRaised {
                        register: self.config.alert_register,
                        value,
                    });
                }
            }
            Err(error) => {
                report.bus_faults += 1;
                sink.emit(&AppEvent::BusFault {
                    op: BusOp::ReadAlert,
                    slave: status_slave,
                    error,
                });
            }
        }

        // 7. Status block
        match ctx.bus.read_registers(
            status_slave,
            self.config.status_register_start,
            self.config.status_register_count,
        ) {
            Ok(regs) => {
                let status = PowerStatus::from_registers(&regs);
                report.status = Some(status);
                sink.emit(&AppEvent::Status(status));
            }
            Err(error) => {
                report.bus_faults += 1;
                sink.emit(&AppEvent::BusFault {
                    op: BusOp::ReadStatus,
                    slave: status_slave,
                    error,
                });
            }
        }

        report
    }

    fn prepare(&self, reading: &SensorReading) -> PreparedFeatures {
        let site = &self.config.site;
        let inputs = PowerInputs {
            battery_level: reading.battery_level,
            temperature_c: reading.temperature_c,
            voltage_v: reading.voltage_v,
            current_a: reading.current_a,
            daily_patients: &site.daily_patients,
            criticality: &site.criticality,
            weather: &site.weather,
            grid_status: grid_status(reading.grid_available),
            time_of_day: time_of_day(reading.hour),
        };
        self.pipeline.prepare(&inputs)
    }

    fn decide_and_actuate<S, E, B, A>(
        &self,
        ctx: &mut DeviceContext<S, E, B, A>,
        features: &PreparedFeatures,
        report: &mut TickReport,
        sink: &mut impl EventSink,
    ) where
        E: InferenceEngine,
        B: FieldBus,
    {
        let output = match ctx.model.run(&features.quantized) {
            Ok(output) => output,
            Err(e) => {
                warn!("inference failed: {}", e);
                sink.emit(&AppEvent::InferenceSkipped(e));
                return;
            }
        };
        let Some(decision) = self.labels.decode(&output) else {
            sink.emit(&AppEvent::InferenceSkipped(InferenceError::BufferLength));
            return;
        };
        let command = self.commands[decision.class];
        report.class = Some(decision.class);
        report.command = Some(command);
        sink.emit(&AppEvent::Decision {
            class: decision.class,
            label: decision.label.to_string(),
            score: decision.score,
            command,
        });

        let (slave, register) = (self.config.plc_slave, self.config.command_register);
        let written = retry_on_timeout(self.config.bus.max_retries, || {
            ctx.bus.write_register(slave, register, command)
        });
        match written {
            Ok(()) => {
                report.command_written = true;
                sink.emit(&AppEvent::CommandWritten {
                    slave,
                    register,
                    value: command,
                });
            }
            Err(error) => {
                report.bus_faults += 1;
                sink.emit(&AppEvent::BusFault {
                    op: BusOp::WriteCommand,
                    slave,
                    error,
                });
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> DeploymentTables {
        DeploymentTables::builtin().unwrap()
    }

    #[test]
    fn hour_maps_to_time_of_day() {
        assert_eq!(time_of_day(Some(5)), "Morning");
        assert_eq!(time_of_day(Some(11)), "Morning");
        assert_eq!(time_of_day(Some(12)), "Afternoon");
        assert_eq!(time_of_day(Some(17)), "Afternoon");
        assert_eq!(time_of_day(Some(18)), "Night");
        assert_eq!(time_of_day(Some(0)), "Night");
        assert_eq!(time_of_day(None), "");
        assert_eq!(time_of_day(Some(24)), "");
    }

    #[test]
    fn unmapped_label_is_fatal() {
        let mut config = SystemConfig::default();
        config.command_map.retain(|m| m.label != "Grid");
        assert_eq!(
            ControlService::new(config, &tables()).err(),
            Some(ConfigFault::UnmappedLabel(2))
        );
    }

    #[test]
    fn table_schema_version_must_match_firmware() {
        let mut t = tables();
        t.schema_version = SCHEMA_VERSION + 1;
        assert!(matches!(
            ControlService::new(SystemConfig::default(), &t),
            Err(ConfigFault::SchemaVersion { .. })
        ));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let mut config = SystemConfig::default();
        config.bus.max_retries = 9;
        assert!(matches!(
            ControlService::new(config, &tables()),
            Err(ConfigFault::Field(_))
        ));
    }

    #[test]
    fn expected_schema_follows_label_count() {
        let svc = ControlService::new(SystemConfig::default(), &tables()).unwrap();
        assert_eq!(svc.expected_schema(), ModelSchema::expected(4));
    }
}
