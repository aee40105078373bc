//! One-shot hardware peripheral initialization.
//!
//! Configures ADC channels and GPIO directions using raw ESP-IDF sys
//! calls.  Called once from `main()` before the control loop starts.
//! UARTs are installed separately by `adapters::uart`.
//!
//! On host builds every accessor is backed by in-memory simulation state
//! that tests can inject into.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::error::SensorError;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::AdcInitFailed(_) => Self::Init("adc"),
            HwInitError::GpioConfigFailed(_) => Self::Init("gpio"),
        }
    }
}

pub const ADC1_CH_BATTERY: u32 = 4;
pub const ADC1_CH_TEMP: u32 = 5;
pub const ADC1_CH_VOLTAGE: u32 = 6;
pub const ADC1_CH_CURRENT: u32 = 7;

/// Full-scale reading of the 12-bit ADC.
pub const ADC_MAX: u16 = 4095;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    for channel in [ADC1_CH_BATTERY, ADC1_CH_TEMP, ADC1_CH_VOLTAGE, ADC1_CH_CURRENT] {
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }
    }

    info!("hw_init: ADC1 configured (CH4=batt, CH5=temp, CH6=volt, CH7=amps)");
    Ok(())
}

/// Raw 12-bit reading.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        log::warn!("hw_init: ADC1 ch{} read failed ({})", channel, ret);
        return Err(SensorError::Adc { channel, code: ret });
    }
    Ok(raw.clamp(0, i32::from(ADC_MAX)) as u16)
}

/// Driver code reported for a simulated read failure (`ESP_ERR_INVALID_STATE`).
#[cfg(not(target_os = "espidf"))]
pub const SIM_ADC_FAULT_CODE: i32 = 0x103;

#[cfg(not(target_os = "espidf"))]
static SIM_ADC: [AtomicU16; 8] = [const { AtomicU16::new(0) }; 8];

#[cfg(not(target_os = "espidf"))]
static SIM_ADC_FAULT: [AtomicBool; 8] = [const { AtomicBool::new(false) }; 8];

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let index = channel as usize;
    let fault = SIM_ADC_FAULT
        .get(index)
        .is_none_or(|f| f.load(Ordering::Relaxed));
    if fault {
        log::warn!("hw_init(sim): ADC1 ch{} read failed", channel);
        return Err(SensorError::Adc {
            channel,
            code: SIM_ADC_FAULT_CODE,
        });
    }
    Ok(SIM_ADC[index].load(Ordering::Relaxed))
}

/// Inject a raw reading for `channel` (host simulation only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(channel: u32, raw: u16) {
    if let Some(c) = SIM_ADC.get(channel as usize) {
        c.store(raw.min(ADC_MAX), Ordering::Relaxed);
    }
}

/// Make reads on `channel` fail until cleared (host simulation only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc_fault(channel: u32, fault: bool) {
    if let Some(f) = SIM_ADC_FAULT.get(channel as usize) {
        f.store(fault, Ordering::Relaxed);
    }
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio() -> Result<(), HwInitError> {
    let input = gpio_config_t {
        pin_bit_mask: 1u64 << pins::GRID_SENSE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&input) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    let output = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RS485_DE_RE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&output) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    // Transceiver starts in receive mode.
    unsafe { gpio_set_level(pins::RS485_DE_RE_GPIO, 0) };

    info!("hw_init: GPIO configured (grid sense in, DE/RE out)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an output pin configured in
    // init_gpio(). Main-loop only.
    unsafe { gpio_set_level(pin, u32::from(high)); }
}

#[cfg(not(target_os = "espidf"))]
static SIM_GPIO: [AtomicBool; 40] = [const { AtomicBool::new(false) }; 40];

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    usize::try_from(pin)
        .ok()
        .and_then(|p| SIM_GPIO.get(p))
        .is_some_and(|g| g.load(Ordering::Relaxed))
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    if let Some(g) = usize::try_from(pin).ok().and_then(|p| SIM_GPIO.get(p)) {
        g.store(high, Ordering::Relaxed);
    }
}

/// A configured push-pull output as an `embedded-hal` pin.
///
/// Used for the RS-485 direction line so the bus master stays generic
/// over the pin implementation.
#[derive(Debug)]
pub struct GpioOutput {
    pin: i32,
}

impl GpioOutput {
    /// `pin` must already be configured as an output by [`init_peripherals`].
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }

    pub fn is_set_high(&self) -> bool {
        gpio_read(self.pin)
    }
}

impl embedded_hal::digital::ErrorType for GpioOutput {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, true);
        Ok(())
    }
}
