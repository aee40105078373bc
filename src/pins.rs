//! GPIO / peripheral pin assignments for the CliniPower controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// RS-485 field bus (MAX485 transceiver on UART1)
// ---------------------------------------------------------------------------

/// UART peripheral number for the field bus.
pub const BUS_UART_NUM: i32 = 1;
pub const BUS_UART_TX_GPIO: i32 = 25;
pub const BUS_UART_RX_GPIO: i32 = 26;
/// Digital output: DE and RE tied together.  HIGH = transmit, LOW = receive.
pub const RS485_DE_RE_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// GSM modem (SIM800-class, UART2)
// ---------------------------------------------------------------------------

pub const GSM_UART_NUM: i32 = 2;
pub const GSM_UART_TX_GPIO: i32 = 17;
pub const GSM_UART_RX_GPIO: i32 = 16;
pub const GSM_BAUD_RATE: u32 = 9600;

// ---------------------------------------------------------------------------
// Analog front end (ADC1, 12 dB attenuation, 12-bit)
// ---------------------------------------------------------------------------

/// Battery state-of-charge divider.  ADC1 channel 4 (GPIO 32).
pub const BATTERY_ADC_GPIO: i32 = 32;
/// LM35-style temperature sensor.  ADC1 channel 5 (GPIO 33).
pub const TEMP_ADC_GPIO: i32 = 33;
/// AC voltage transformer + rectifier.  ADC1 channel 6 (GPIO 34).
pub const VOLTAGE_ADC_GPIO: i32 = 34;
/// Hall current sensor.  ADC1 channel 7 (GPIO 35).
pub const CURRENT_ADC_GPIO: i32 = 35;

// ---------------------------------------------------------------------------
// Digital inputs
// ---------------------------------------------------------------------------

/// Mains-present opto-isolator.  HIGH = grid available.
pub const GRID_SENSE_GPIO: i32 = 27;
