//! CliniPower Firmware: Main Entry Point
//!
//! Hexagonal architecture with a fixed-period control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorHub      BusMaster<UartLink>   GsmAlertSink   NvsAdapter│
//! │  (SensorPort)   (FieldBus)            (AlertSink)    (Config)  │
//! │  LogEventSink   DenseModel            Watchdog                 │
//! │  (EventSink)    (InferenceEngine)                              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ControlService (pure logic)                 │    │
//! │  │  encode · normalize · quantize · infer · decode        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{debug, error, info, warn};

use clinipower::adapters::gsm::{GsmAlertSink, SEND_SEQUENCE_MS};
use clinipower::adapters::log_sink::LogEventSink;
use clinipower::adapters::nvs::{NvsAdapter, load_model_blob};
use clinipower::adapters::time::Esp32TimeAdapter;
use clinipower::adapters::uart::{UartLink, UartSettings};
use clinipower::app::ports::ConfigPort;
use clinipower::app::service::{ControlService, DeviceContext};
use clinipower::bus::{BusMaster, BusTiming};
use clinipower::config::SystemConfig;
use clinipower::drivers::hw_init::{self, GpioOutput};
use clinipower::drivers::watchdog::Watchdog;
use clinipower::inference::dense::DenseModel;
use clinipower::sensors::{AnalogCalibration, SensorHub};
use clinipower::tables::DeploymentTables;
use clinipower::{Error, pins};

/// Log the reason and stop.  The watchdog is not armed yet, so the device
/// stays halted instead of boot-looping on a bad configuration.
fn halt(err: &Error) -> ! {
    error!("FATAL | {}, halting", err);
    loop {
        FreeRtos::delay_ms(60_000);
    }
}

/// Worst-case blocking inside one tick: every bus transaction timing out
/// (command write with retries, alert read, status read) plus one SMS.
fn worst_case_tick_ms(config: &SystemConfig) -> u32 {
    let per_transaction = config.bus.response_timeout_ms + 300;
    let transactions = u32::from(config.bus.max_retries) + 3;
    transactions * per_transaction + SEND_SEQUENCE_MS
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CliniPower v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1b. Initialise hardware peripherals ───────────────────
    if let Err(e) = hw_init::init_peripherals() {
        halt(&e.into());
    }

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(_) => halt(&Error::Init("nvs")),
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Tables, model, service ─────────────────────────────
    let tables = DeploymentTables::builtin().unwrap_or_else(|e| halt(&e.into()));
    let mut service =
        ControlService::new(config.clone(), &tables).unwrap_or_else(|e| halt(&e.into()));

    let blob = load_model_blob(&nvs).unwrap_or_else(|e| {
        error!("model blob: {}", e);
        halt(&Error::Init("model blob missing"))
    });
    let model = DenseModel::from_bytes(&blob)
        .and_then(|m| service.bind_model(m))
        .unwrap_or_else(|e| halt(&e.into()));

    // ── 4. Construct adapters ─────────────────────────────────
    let bus_link = UartLink::install(UartSettings {
        port: pins::BUS_UART_NUM,
        tx_gpio: pins::BUS_UART_TX_GPIO,
        rx_gpio: pins::BUS_UART_RX_GPIO,
        baud_rate: config.bus.baud_rate,
    })
    .unwrap_or_else(|e| {
        error!("bus {}", e);
        halt(&Error::Init("bus uart"))
    });
    let timing = BusTiming {
        response_timeout_ms: config.bus.response_timeout_ms,
        inter_byte_timeout_ms: config.bus.inter_byte_timeout_ms,
    };
    let bus = BusMaster::new(bus_link, GpioOutput::new(pins::RS485_DE_RE_GPIO), timing)
        .unwrap_or_else(|e| halt(&e.into()));

    let gsm_link = UartLink::install(UartSettings {
        port: pins::GSM_UART_NUM,
        tx_gpio: pins::GSM_UART_TX_GPIO,
        rx_gpio: pins::GSM_UART_RX_GPIO,
        baud_rate: pins::GSM_BAUD_RATE,
    })
    .unwrap_or_else(|e| {
        error!("gsm {}", e);
        halt(&Error::Init("gsm uart"))
    });
    let alerts = GsmAlertSink::new(gsm_link, FreeRtos, &config.alert_phone);

    let mut ctx = DeviceContext {
        sensors: SensorHub::new(AnalogCalibration::default(), Esp32TimeAdapter::new()),
        model,
        bus,
        alerts,
    };
    let mut log_sink = LogEventSink::new();
    let clock = Esp32TimeAdapter::new();

    // ── 5. Start ──────────────────────────────────────────────
    service.start(&mut ctx.alerts, &mut log_sink);

    let period_ms = config.control_loop_interval_ms;
    let watchdog = Watchdog::new(Watchdog::timeout_for(period_ms, worst_case_tick_ms(&config)));
    info!("System ready. Entering control loop ({} ms).", period_ms);

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        let started = clock.uptime_ms();
        watchdog.feed();

        let report = service.tick(&mut ctx, &mut log_sink);
        debug!(
            "tick {} class={:?} written={} alert={:?} faults={}",
            report.tick, report.class, report.command_written, report.alert_value, report.bus_faults
        );

        watchdog.feed();
        let elapsed = clock.uptime_ms().saturating_sub(started);
        let remaining = u64::from(period_ms).saturating_sub(elapsed);
        if remaining == 0 {
            warn!("tick {} overran period ({} ms)", report.tick, elapsed);
        } else {
            FreeRtos::delay_ms(remaining as u32);
        }
    }
}
