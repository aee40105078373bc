//! UART adapter implementing [`SerialLink`].
//!
//! - **`target_os = "espidf"`**: the ESP-IDF UART driver via raw sys
//!   calls: RX ring buffer, blocking reads with a tick timeout, and
//!   `uart_wait_tx_done` so the RS-485 driver is released only after the
//!   last stop bit.
//! - **`not(target_os = "espidf")`**: an in-memory loopback for host
//!   simulation: bytes injected with `sim_inject_rx` are returned by
//!   `read`, written bytes are captured for `sim_take_tx`.

use crate::bus::transport::SerialLink;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

const RX_RING_BYTES: i32 = 512;

/// ESP-IDF error code from a UART call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartError(pub i32);

impl core::fmt::Display for UartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "uart error {}", self.0)
    }
}

/// Line settings for [`UartLink::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartSettings {
    pub port: i32,
    pub tx_gpio: i32,
    pub rx_gpio: i32,
    pub baud_rate: u32,
}

pub struct UartLink {
    settings: UartSettings,
    #[cfg(not(target_os = "espidf"))]
    rx: VecDeque<u8>,
    #[cfg(not(target_os = "espidf"))]
    tx: Vec<u8>,
}

#[cfg(target_os = "espidf")]
fn ms_to_ticks(ms: u32) -> TickType_t {
    let ticks = u64::from(ms) * u64::from(configTICK_RATE_HZ) / 1000;
    // A non-zero wait must not round down to a poll.
    (ticks.max(u64::from(ms > 0))) as TickType_t
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t) -> Result<(), UartError> {
    if ret == ESP_OK { Ok(()) } else { Err(UartError(ret)) }
}

impl UartLink {
    /// Install the driver for `settings.port`, 8N1, no flow control.
    #[cfg(target_os = "espidf")]
    pub fn install(settings: UartSettings) -> Result<Self, UartError> {
        let cfg = uart_config_t {
            baud_rate: settings.baud_rate as i32,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            ..Default::default()
        };
        // SAFETY: called once per port from main() before the control loop.
        unsafe {
            check(uart_driver_install(
                settings.port,
                RX_RING_BYTES,
                0,
                0,
                core::ptr::null_mut(),
                0,
            ))?;
            check(uart_param_config(settings.port, &cfg))?;
            check(uart_set_pin(
                settings.port,
                settings.tx_gpio,
                settings.rx_gpio,
                UART_PIN_NO_CHANGE,
                UART_PIN_NO_CHANGE,
            ))?;
        }
        log::info!(
            "uart{}: {} baud, tx={} rx={}",
            settings.port,
            settings.baud_rate,
            settings.tx_gpio,
            settings.rx_gpio
        );
        Ok(Self { settings })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn install(settings: UartSettings) -> Result<Self, UartError> {
        log::info!("uart{}(sim): {} baud", settings.port, settings.baud_rate);
        Ok(Self {
            settings,
            rx: VecDeque::with_capacity(RX_RING_BYTES as usize),
            tx: Vec::new(),
        })
    }

    pub fn settings(&self) -> UartSettings {
        self.settings
    }

    /// Queue bytes as if they had arrived on the wire.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Everything written since the last call.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

impl SerialLink for UartLink {
    type Error = UartError;

    #[cfg(target_os = "espidf")]
    fn write(&mut self, data: &[u8]) -> Result<usize, UartError> {
        // SAFETY: driver installed in `install`; data outlives the call.
        let n = unsafe { uart_write_bytes(self.settings.port, data.as_ptr().cast(), data.len()) };
        usize::try_from(n).map_err(|_| UartError(n))
    }

    #[cfg(target_os = "espidf")]
    fn flush(&mut self) -> Result<(), UartError> {
        // Bounded: a full 256-byte frame at 1200 baud is ~2.1 s.
        check(unsafe { uart_wait_tx_done(self.settings.port, ms_to_ticks(3_000)) })
    }

    #[cfg(target_os = "espidf")]
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, UartError> {
        if buf.is_empty() {
            return Ok(0);
        }
        // SAFETY: buf is valid for buf.len() bytes for the duration of the call.
        let n = unsafe {
            uart_read_bytes(
                self.settings.port,
                buf.as_mut_ptr().cast(),
                buf.len() as u32,
                ms_to_ticks(timeout_ms),
            )
        };
        usize::try_from(n).map_err(|_| UartError(n))
    }

    #[cfg(target_os = "espidf")]
    fn discard_input(&mut self) -> Result<(), UartError> {
        check(unsafe { uart_flush_input(self.settings.port) })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, data: &[u8]) -> Result<usize, UartError> {
        self.tx.extend_from_slice(data);
        Ok(data.len())
    }

    #[cfg(not(target_os = "espidf"))]
    fn flush(&mut self) -> Result<(), UartError> {
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, UartError> {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    #[cfg(not(target_os = "espidf"))]
    fn discard_input(&mut self) -> Result<(), UartError> {
        self.rx.clear();
        Ok(())
    }
}
