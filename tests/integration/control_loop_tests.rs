//! Integration tests: ControlService → model → BusMaster → alerts.

use clinipower::app::events::{AppEvent, BusOp, PowerStatus};
use clinipower::app::service::{ControlService, DeviceContext};
use clinipower::bus::{BusMaster, BusTiming};
use clinipower::config::SystemConfig;
use clinipower::error::{BusError, InferenceError, SensorError};
use clinipower::tables::DeploymentTables;

use super::mock_hw::{AlertLog, DirectionPin, EventLog, FixedSensors, SimBus, StubEngine};

type Ctx = DeviceContext<FixedSensors, StubEngine, BusMaster<SimBus, DirectionPin>, AlertLog>;

const ALERT_REG: u16 = 0;
const COMMAND_REG: u16 = 200;

/// PLC and power-status panel share slave 1 in the default config.
fn panel() -> SimBus {
    SimBus::new().with_slave(
        1,
        &[(ALERT_REG, 0), (1, 1), (2, 0), (3, 64), (4, 0), (COMMAND_REG, 0)],
    )
}

fn service() -> ControlService {
    ControlService::new(SystemConfig::default(), &DeploymentTables::builtin().unwrap()).unwrap()
}

fn setup(engine: StubEngine, bus: SimBus) -> (ControlService, Ctx) {
    let svc = service();
    let model = svc.bind_model(engine).unwrap();
    let ctx = DeviceContext {
        sensors: FixedSensors::morning(),
        model,
        bus: BusMaster::new(bus, DirectionPin::default(), BusTiming::default()).unwrap(),
        alerts: AlertLog::default(),
    };
    (svc, ctx)
}

/// Scores favouring "Grid" (class 2 of Battery, Generator, Grid, Solar).
fn grid_engine() -> StubEngine {
    StubEngine::new(4, &[-20, 5, 90, 10])
}

#[test]
fn start_sends_boot_notification() {
    let (mut svc, mut ctx) = setup(grid_engine(), panel());
    let mut events = EventLog::default();
    svc.start(&mut ctx.alerts, &mut events);
    assert_eq!(events.events, [AppEvent::Started { labels: 4 }]);
    assert_eq!(ctx.alerts.sent, ["System booted, power monitoring active."]);
}

#[test]
fn tick_feeds_the_model_the_quantized_vector() {
    let (mut svc, mut ctx) = setup(grid_engine(), panel());
    let report = svc.tick(&mut ctx, &mut EventLog::default());
    assert_eq!(ctx.model.engine().inputs, [vec![29, 7, 14, -31, 46, -52, 46, -43, -3]]);
    let features = report.features.unwrap();
    assert_eq!(features.quantized, [29, 7, 14, -31, 46, -52, 46, -43, -3]);
}

#[test]
fn tick_writes_the_mapped_command_and_polls_status() {
    let (mut svc, mut ctx) = setup(grid_engine(), panel());
    let mut events = EventLog::default();
    let report = svc.tick(&mut ctx, &mut events);

    assert_eq!(report.tick, 1);
    assert_eq!(report.class, Some(2));
    assert_eq!(report.command, Some(3));
    assert!(report.command_written);
    assert_eq!(report.alert_value, Some(0));
    assert!(!report.alert_raised);
    assert_eq!(report.bus_faults, 0);
    assert_eq!(ctx.bus.link().register(1, COMMAND_REG), Some(3));

    let status = PowerStatus {
        grid: Some(1),
        solar: Some(0),
        battery: Some(64),
        generator: Some(0),
    };
    assert_eq!(
        events.events,
        [
            AppEvent::Decision {
                class: 2,
                label: "Grid".to_string(),
                score: 90,
                command: 3,
            },
            AppEvent::CommandWritten {
                slave: 1,
                register: COMMAND_REG,
                value: 3,
            },
            AppEvent::Status(status),
        ]
    );
    assert!(ctx.alerts.sent.is_empty());
}

#[test]
fn critical_alert_register_notifies_every_tick() {
    let (mut svc, mut ctx) = setup(grid_engine(), panel());
    ctx.bus.link_mut().set_register(1, ALERT_REG, 1);
    let mut events = EventLog::default();

    let first = svc.tick(&mut ctx, &mut events);
    let second = svc.tick(&mut ctx, &mut events);

    assert!(first.alert_raised && second.alert_raised);
    assert_eq!(ctx.alerts.sent, ["Critical power failure detected!"; 2]);
    let raised = events
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::AlertRaised { register: 0, value: 1 }))
        .count();
    assert_eq!(raised, 2);
    assert_eq!(svc.tick_count(), 2);
}

#[test]
fn non_critical_alert_value_is_ignored() {
    let (mut svc, mut ctx) = setup(grid_engine(), panel());
    ctx.bus.link_mut().set_register(1, ALERT_REG, 5);
    let report = svc.tick(&mut ctx, &mut EventLog::default());
    assert_eq!(report.alert_value, Some(5));
    assert!(!report.alert_raised);
    assert!(ctx.alerts.sent.is_empty());
}

#[test]
fn sensor_fault_skips_the_decision_but_still_polls_alerts() {
    let (mut svc, mut ctx) = setup(grid_engine(), panel());
    ctx.sensors = FixedSensors::faulty(6);
    ctx.bus.link_mut().set_register(1, ALERT_REG, 1);
    let mut events = EventLog::default();
    let report = svc.tick(&mut ctx, &mut events);

    assert_eq!(report.features, None);
    assert_eq!(report.class, None);
    assert!(!report.command_written);
    assert!(ctx.model.engine().inputs.is_empty());
    assert_eq!(ctx.bus.link().register(1, COMMAND_REG), Some(0));
    assert!(report.alert_raised);
    assert!(report.status.is_some());
    assert_eq!(
        events.events[0],
        AppEvent::SensorFault(SensorError::Adc {
            channel: 6,
            code: -1
        })
    );
    assert_eq!(ctx.bus.link().requests.len(), 2);
}

#[test]
fn inference_failure_skips_actuation_only() {
    let (mut svc, mut ctx) = setup(StubEngine::failing(4), panel());
    let mut events = EventLog::default();
    let report = svc.tick(&mut ctx, &mut events);

    assert_eq!(report.class, None);
    assert!(!report.command_written);
    assert!(report.status.is_some());
    assert_eq!(ctx.bus.link().register(1, COMMAND_REG), Some(0));
    assert_eq!(events.events[0], AppEvent::InferenceSkipped(InferenceError::InvokeFailed));
    // Only the alert and status reads went out.
    assert_eq!(ctx.bus.link().requests.len(), 2);
}

#[test]
fn silent_panel_is_reported_and_the_tick_completes() {
    let (mut svc, mut ctx) = setup(grid_engine(), SimBus::new());
    let mut events = EventLog::default();
    let report = svc.tick(&mut ctx, &mut events);

    assert_eq!(report.class, Some(2));
    assert!(!report.command_written);
    assert_eq!(report.alert_value, None);
    assert_eq!(report.status, None);
    assert_eq!(report.bus_faults, 3);
    // Default config retries the command write once.
    assert_eq!(ctx.bus.link().requests.len(), 4);
    assert!(!ctx.bus.direction().is_high());

    let faults: Vec<BusOp> = events
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::BusFault {
                op,
                error: BusError::Timeout,
                ..
            } => Some(*op),
            _ => None,
        })
        .collect();
    assert_eq!(faults, [BusOp::WriteCommand, BusOp::ReadAlert, BusOp::ReadStatus]);
}

#[test]
fn ties_resolve_to_the_first_class() {
    let (mut svc, mut ctx) = setup(StubEngine::new(4, &[40, 40, 12, 40]), panel());
    let report = svc.tick(&mut ctx, &mut EventLog::default());
    assert_eq!(report.class, Some(0));
    assert_eq!(ctx.bus.link().register(1, COMMAND_REG), Some(1));
}

#[test]
fn model_with_wrong_output_shape_is_rejected() {
    let svc = service();
    assert!(svc.bind_model(StubEngine::new(3, &[0, 0, 0])).is_err());
}
