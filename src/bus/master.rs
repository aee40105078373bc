//! Modbus RTU master over a half-duplex RS-485 transceiver.
//!
//! One transaction at a time, strictly request/response:
//!
//! ```text
//!   discard stale RX ─▶ DE high ─▶ write + flush ─▶ DE low ─▶ receive ─▶ decode
//!                        └──────── TxGuard ────────┘
//! ```
//!
//! The direction pin is only ever driven high inside a [`TxGuard`], which
//! de-asserts it on every exit path, including early returns on link
//! errors.  A transceiver left in transmit mode would hold the bus and
//! block every slave's reply.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use super::frame::{self, Adu, HEADER_LEN, MAX_ADU_LEN, Registers, Request, Response};
use super::transport::{SerialLink, write_all};
use crate::error::{BusError, ProtocolError};

/// Receive windows for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    /// Wait for the first response byte.
    pub response_timeout_ms: u32,
    /// Maximum silence between bytes once a response has started.
    pub inter_byte_timeout_ms: u32,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            response_timeout_ms: 200,
            inter_byte_timeout_ms: 20,
        }
    }
}

/// Holds the RS-485 driver enabled; releases it on drop.
struct TxGuard<'a, P: OutputPin> {
    pin: &'a mut P,
    released: bool,
}

impl<'a, P: OutputPin> TxGuard<'a, P> {
    fn acquire(pin: &'a mut P) -> Result<Self, BusError> {
        pin.set_high().map_err(|e| {
            warn!("rs485: DE assert failed: {:?}", e);
            BusError::Link
        })?;
        Ok(Self {
            pin,
            released: false,
        })
    }

    /// Switch back to receive, reporting a pin failure.
    fn release(mut self) -> Result<(), BusError> {
        self.released = true;
        self.pin.set_low().map_err(|e| {
            warn!("rs485: DE release failed: {:?}", e);
            BusError::Link
        })
    }
}

impl<P: OutputPin> Drop for TxGuard<'_, P> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.pin.set_low();
        }
    }
}

/// Bus master owning the serial link and the direction-control pin.
pub struct BusMaster<L: SerialLink, P: OutputPin> {
    link: L,
    direction: P,
    timing: BusTiming,
}

impl<L: SerialLink, P: OutputPin> BusMaster<L, P> {
    /// Take ownership of the link and pin, leaving the transceiver in
    /// receive mode.
    pub fn new(link: L, mut direction: P, timing: BusTiming) -> Result<Self, BusError> {
        direction.set_low().map_err(|e| {
            warn!("rs485: DE init failed: {:?}", e);
            BusError::Link
        })?;
        Ok(Self {
            link,
            direction,
            timing,
        })
    }

    pub fn timing(&self) -> BusTiming {
        self.timing
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn direction(&self) -> &P {
        &self.direction
    }

    /// Function 0x03: read `count` consecutive holding registers.
    pub fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> Result<Registers, BusError> {
        let request = Request::ReadHoldingRegisters {
            slave,
            address,
            count,
        };
        match self.transact(&request)? {
            Response::Registers(regs) => Ok(regs),
            Response::Written { .. } => Err(ProtocolError::WrongFunction.into()),
        }
    }

    /// Function 0x06: write one holding register and verify the echo.
    pub fn write_single_register(
        &mut self,
        slave: u8,
        address: u16,
        value: u16,
    ) -> Result<(), BusError> {
        let request = Request::WriteSingleRegister {
            slave,
            address,
            value,
        };
        self.transact(&request).map(|_| ())
    }

    fn transact(&mut self, request: &Request) -> Result<Response, BusError> {
        let adu = request.encode()?;

        self.link.discard_input().map_err(link_error)?;
        self.send(&adu)?;

        let mut buf = [0u8; MAX_ADU_LEN];
        let len = self.receive(request, &mut buf)?;
        debug!("rtu rx {:02X?}", &buf[..len]);
        frame::decode_response(request, &buf[..len]).map_err(BusError::from)
    }

    fn send(&mut self, adu: &Adu) -> Result<(), BusError> {
        debug!("rtu tx {:02X?}", &adu[..]);
        let guard = TxGuard::acquire(&mut self.direction)?;
        let sent = write_all(&mut self.link, adu).map_err(link_error)?;
        if sent != adu.len() {
            warn!("rtu: short write {}/{}", sent, adu.len());
            return Err(BusError::Link);
        }
        self.link.flush().map_err(link_error)?;
        guard.release()
    }

    /// Collect one response frame into `buf`.
    ///
    /// The header is read first so the total length can be derived from
    /// the function byte; the first byte must arrive within the response
    /// window, every later chunk within the inter-byte window.
    fn receive(
        &mut self,
        request: &Request,
        buf: &mut [u8; MAX_ADU_LEN],
    ) -> Result<usize, BusError> {
        let mut filled = 0;
        let mut expected = HEADER_LEN;
        let mut header_seen = false;
        let mut window = self.timing.response_timeout_ms;

        loop {
            while filled < expected {
                let n = self
                    .link
                    .read(&mut buf[filled..expected], window)
                    .map_err(link_error)?;
                if n == 0 {
                    if filled > 0 {
                        debug!("rtu: partial frame {:02X?}", &buf[..filled]);
                    }
                    return Err(BusError::Timeout);
                }
                filled += n;
                window = self.timing.inter_byte_timeout_ms;
            }
            if header_seen {
                return Ok(filled);
            }
            header_seen = true;
            expected = request.response_len(buf[1]);
        }
    }
}

fn link_error<E: core::fmt::Debug>(e: E) -> BusError {
    warn!("rtu: link error: {:?}", e);
    BusError::Link
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::convert::Infallible;

    use super::*;
    use crate::bus::frame::crc16;

    #[derive(Default)]
    struct Script {
        written: Vec<u8>,
        /// Chunks handed out per `read` call; `None` is a silent window.
        replies: VecDeque<Option<Vec<u8>>>,
        windows: Vec<u32>,
        discards: usize,
    }

    impl SerialLink for Script {
        type Error = Infallible;

        fn write(&mut self, data: &[u8]) -> Result<usize, Infallible> {
            self.written.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Infallible> {
            self.windows.push(timeout_ms);
            match self.replies.pop_front() {
                Some(Some(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.replies.push_front(Some(chunk.split_off(n)));
                    }
                    Ok(n)
                }
                _ => Ok(0),
            }
        }

        fn discard_input(&mut self) -> Result<(), Infallible> {
            self.discards += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Pin {
        high: bool,
        edges: Vec<bool>,
    }

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.edges.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.edges.push(true);
            Ok(())
        }
    }

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut v = body.to_vec();
        v.extend_from_slice(&crc16(body).to_le_bytes());
        v
    }

    fn master(replies: Vec<Option<Vec<u8>>>) -> BusMaster<Script, Pin> {
        let link = Script {
            replies: replies.into(),
            ..Script::default()
        };
        BusMaster::new(link, Pin::default(), BusTiming::default()).unwrap()
    }

    #[test]
    fn read_sends_exact_frame_and_toggles_direction() {
        let mut m = master(vec![Some(framed(&[0x01, 0x03, 0x02, 0x00, 0x01]))]);
        let regs = m.read_holding_registers(1, 0, 1).unwrap();
        assert_eq!(&regs[..], &[1]);
        assert_eq!(m.link().written, [0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]);
        assert_eq!(m.link().discards, 1);
        // init low, assert, release
        assert_eq!(m.direction().edges, [false, true, false]);
        assert!(!m.direction().high);
    }

    #[test]
    fn silent_slave_times_out_in_receive_mode() {
        let mut m = master(vec![None]);
        assert_eq!(m.read_holding_registers(1, 0, 1), Err(BusError::Timeout));
        assert!(!m.direction().high);
        assert_eq!(m.link().windows, [200]);
    }

    #[test]
    fn fragmented_response_is_reassembled() {
        let whole = framed(&[0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B]);
        let chunks = vec![
            Some(whole[..1].to_vec()),
            Some(whole[1..4].to_vec()),
            Some(whole[4..].to_vec()),
        ];
        let mut m = master(chunks);
        let regs = m.read_holding_registers(1, 0, 2).unwrap();
        assert_eq!(&regs[..], &[10, 11]);
        // first window is the response timeout, the rest are inter-byte
        assert_eq!(m.link().windows[0], 200);
        assert!(m.link().windows[1..].iter().all(|&w| w == 20));
    }

    #[test]
    fn gap_inside_frame_is_a_timeout() {
        let whole = framed(&[0x01, 0x03, 0x02, 0x00, 0x01]);
        let mut m = master(vec![Some(whole[..3].to_vec()), None]);
        assert_eq!(m.read_holding_registers(1, 0, 1), Err(BusError::Timeout));
    }

    #[test]
    fn exception_reply_is_reported() {
        let mut m = master(vec![Some(framed(&[0x01, 0x83, 0x02]))]);
        assert_eq!(
            m.read_holding_registers(1, 0, 1),
            Err(BusError::Protocol(ProtocolError::Exception(0x02)))
        );
    }

    #[test]
    fn write_verifies_echo() {
        let echo = framed(&[0x01, 0x06, 0x00, 0xC8, 0x00, 0x02]);
        let mut m = master(vec![Some(echo)]);
        m.write_single_register(1, 200, 2).unwrap();
        assert_eq!(m.link().written, [0x01, 0x06, 0x00, 0xC8, 0x00, 0x02, 0x89, 0xF5]);
    }

    #[test]
    fn invalid_request_never_touches_the_bus() {
        let mut m = master(vec![]);
        assert_eq!(m.read_holding_registers(0, 0, 1), Err(BusError::InvalidRequest));
        assert!(m.link().written.is_empty());
        assert_eq!(m.direction().edges, [false]);
    }

    struct StuckLink;

    impl SerialLink for StuckLink {
        type Error = &'static str;

        fn write(&mut self, _data: &[u8]) -> Result<usize, &'static str> {
            Err("tx fifo")
        }

        fn flush(&mut self) -> Result<(), &'static str> {
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8], _timeout_ms: u32) -> Result<usize, &'static str> {
            Ok(0)
        }

        fn discard_input(&mut self) -> Result<(), &'static str> {
            Ok(())
        }
    }

    #[test]
    fn link_error_still_releases_direction_pin() {
        let mut m = BusMaster::new(StuckLink, Pin::default(), BusTiming::default()).unwrap();
        assert_eq!(m.write_single_register(1, 200, 2), Err(BusError::Link));
        assert!(!m.direction().high);
        assert_eq!(m.direction().edges, [false, true, false]);
    }
}
