//! RS-485 field bus: Modbus RTU framing, the serial link seam and the
//! single-transaction master.

pub mod frame;
pub mod master;
pub mod transport;

pub use master::{BusMaster, BusTiming};
pub use transport::SerialLink;

use crate::error::BusError;

/// Upper bound on retries a configuration may request.
pub const MAX_RETRIES: u8 = 3;

/// Run `op`, retrying up to `retries` more times while it times out.
///
/// Only [`BusError::Timeout`] is retried: a CRC or exception reply means
/// the slave is talking and repeating the request will not help.
pub fn retry_on_timeout<T, F>(retries: u8, mut op: F) -> Result<T, BusError>
where
    F: FnMut() -> Result<T, BusError>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if e.is_timeout() && attempt < retries.min(MAX_RETRIES) => {
                attempt += 1;
                log::debug!("bus: timeout, retry {}/{}", attempt, retries);
            }
            other => return other,
        }
    }
}
