//! SMS alert sink over a SIM800-class GSM modem.
//!
//! Text-mode send sequence:
//!
//! ```text
//!   AT+CMGF=1\r\n            wait 1 s
//!   AT+CMGS="<phone>"\r\n    wait 1 s
//!   <message>                wait 1 s
//!   0x1A (Ctrl-Z)            wait 5 s
//! ```
//!
//! The modem's replies are not parsed.  Failures are logged and counted,
//! never returned: the control loop must not depend on SMS delivery.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::AlertSink;
use crate::bus::transport::{SerialLink, write_all};

const CTRL_Z: u8 = 0x1A;
const ESC: u8 = 0x1B;

/// Longest single-part SMS in the GSM 7-bit alphabet.
pub const MAX_SMS_LEN: usize = 160;

const STEP_DELAY_MS: u32 = 1_000;
const SUBMIT_DELAY_MS: u32 = 5_000;

/// Time one send blocks the caller.
pub const SEND_SEQUENCE_MS: u32 = 3 * STEP_DELAY_MS + SUBMIT_DELAY_MS;

#[derive(Debug)]
enum SendError<E> {
    Link(E),
    ShortWrite,
}

/// Delivery counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GsmStats {
    pub sent: u32,
    pub failed: u32,
}

pub struct GsmAlertSink<L: SerialLink, D: DelayNs> {
    link: L,
    delay: D,
    phone: String,
    stats: GsmStats,
}

impl<L: SerialLink, D: DelayNs> GsmAlertSink<L, D> {
    pub fn new(link: L, delay: D, phone: &str) -> Self {
        Self {
            link,
            delay,
            phone: phone.to_string(),
            stats: GsmStats::default(),
        }
    }

    pub fn stats(&self) -> GsmStats {
        self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), SendError<L::Error>> {
        let n = write_all(&mut self.link, bytes).map_err(SendError::Link)?;
        if n != bytes.len() {
            return Err(SendError::ShortWrite);
        }
        Ok(())
    }

    fn send_sms(&mut self, message: &[u8]) -> Result<(), SendError<L::Error>> {
        self.put(b"AT+CMGF=1\r\n")?;
        self.delay.delay_ms(STEP_DELAY_MS);

        let header = format!("AT+CMGS=\"{}\"\r\n", self.phone);
        self.put(header.as_bytes())?;
        self.delay.delay_ms(STEP_DELAY_MS);

        self.put(message)?;
        self.delay.delay_ms(STEP_DELAY_MS);

        self.put(&[CTRL_Z])?;
        self.link.flush().map_err(SendError::Link)?;
        self.delay.delay_ms(SUBMIT_DELAY_MS);
        Ok(())
    }
}

/// Strip the bytes that would end or abort the PDU early, and cap the
/// length at one SMS.
fn sms_body(message: &str) -> Vec<u8> {
    message
        .bytes()
        .filter(|&b| b != CTRL_Z && b != ESC)
        .take(MAX_SMS_LEN)
        .collect()
}

impl<L: SerialLink, D: DelayNs> AlertSink for GsmAlertSink<L, D> {
    fn send_alert(&mut self, message: &str) {
        let body = sms_body(message);
        match self.send_sms(&body) {
            Ok(()) => {
                self.stats.sent += 1;
                info!("GSM | SMS queued to {} ({} bytes)", self.phone, body.len());
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!("GSM | SMS send failed: {:?}", e);
            }
        }
    }
}
