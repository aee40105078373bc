//! Serial link abstraction for the RS-485 field bus.
//!
//! Concrete implementations:
//! - ESP-IDF UART driver (`adapters::uart::UartLink`)
//! - In-memory simulated slaves in the integration tests
//!
//! The bus master and the GSM modem driver are generic over `SerialLink`,
//! so neither knows which UART peripheral it is talking to.

/// Byte-oriented, half-duplex capable serial channel.
pub trait SerialLink {
    /// Error type for this link.
    type Error: core::fmt::Debug;

    /// Queue `data` for transmission.  Returns the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Block until every queued byte has physically left the shifter.
    ///
    /// The master de-asserts the RS-485 driver only after this returns,
    /// otherwise the tail of the frame is cut off.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Wait up to `timeout_ms` for at least one byte, then read as many as
    /// are buffered (up to `buf.len()`).  Returns 0 on timeout.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Drop any stale bytes sitting in the receive buffer.
    fn discard_input(&mut self) -> Result<(), Self::Error>;
}

impl<T: SerialLink + ?Sized> SerialLink for &mut T {
    type Error = T::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        (**self).read(buf, timeout_ms)
    }

    fn discard_input(&mut self) -> Result<(), Self::Error> {
        (**self).discard_input()
    }
}

/// Write as much of `data` as the link accepts, looping over short
/// writes.  Stops early if the driver accepts nothing; the caller compares
/// the returned count against `data.len()`.
pub fn write_all<L: SerialLink>(link: &mut L, data: &[u8]) -> Result<usize, L::Error> {
    let mut sent = 0;
    while sent < data.len() {
        let n = link.write(&data[sent..])?;
        if n == 0 {
            break;
        }
        sent += n;
    }
    Ok(sent)
}
