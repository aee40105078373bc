//! Modbus RTU frame codec.
//!
//! Wire format:
//! ```text
//! ┌───────┬──────────┬──────────────────┬────────┬────────┐
//! │ slave │ function │ payload (N B)    │ crc lo │ crc hi │
//! │ 1B    │ 1B       │                  │ 1B     │ 1B     │
//! └───────┴──────────┴──────────────────┴────────┴────────┘
//! ```
//!
//! Only the two functions the controller needs are encoded:
//!
//! | fn   | request payload            | normal response payload          |
//! |------|----------------------------|----------------------------------|
//! | 0x03 | addr(2) count(2)           | byte_count(1) regs(2·count)      |
//! | 0x06 | addr(2) value(2)           | echo of the request              |
//!
//! An exception response sets bit 7 of the function code and carries a
//! single exception byte.  All multi-byte fields are big-endian except the
//! CRC, which is sent low byte first.

use crate::error::{BusError, ProtocolError};

pub const FN_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FN_WRITE_SINGLE_REGISTER: u8 = 0x06;
const EXCEPTION_FLAG: u8 = 0x80;

/// Largest RTU frame on the wire.
pub const MAX_ADU_LEN: usize = 256;
/// Largest register count a single read may request.
pub const MAX_READ_COUNT: u16 = 125;
/// Bytes needed before the response length is known.
pub const HEADER_LEN: usize = 2;
/// Length of an exception response.
pub const EXCEPTION_LEN: usize = 5;

pub type Adu = heapless::Vec<u8, MAX_ADU_LEN>;
pub type Registers = heapless::Vec<u16, { MAX_READ_COUNT as usize }>;

/// CRC-16/MODBUS: reflected polynomial 0xA001, initial value 0xFFFF.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// A master-initiated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ReadHoldingRegisters { slave: u8, address: u16, count: u16 },
    WriteSingleRegister { slave: u8, address: u16, value: u16 },
}

impl Request {
    pub fn slave(&self) -> u8 {
        match *self {
            Self::ReadHoldingRegisters { slave, .. } | Self::WriteSingleRegister { slave, .. } => {
                slave
            }
        }
    }

    pub fn function(&self) -> u8 {
        match self {
            Self::ReadHoldingRegisters { .. } => FN_READ_HOLDING_REGISTERS,
            Self::WriteSingleRegister { .. } => FN_WRITE_SINGLE_REGISTER,
        }
    }

    /// Serialize into an RTU frame.
    ///
    /// Reads must address a unicast slave (1–247) and request
    /// 1..=[`MAX_READ_COUNT`] registers.  Writes may target any unicast
    /// slave; broadcast writes are refused because they never answer.
    pub fn encode(&self) -> Result<Adu, BusError> {
        let (a, b) = match *self {
            Self::ReadHoldingRegisters { address, count, .. } => {
                if count == 0 || count > MAX_READ_COUNT {
                    return Err(BusError::InvalidRequest);
                }
                (address, count)
            }
            Self::WriteSingleRegister { address, value, .. } => (address, value),
        };
        if !(1..=247).contains(&self.slave()) {
            return Err(BusError::InvalidRequest);
        }

        let mut adu = Adu::new();
        let [a_hi, a_lo] = a.to_be_bytes();
        let [b_hi, b_lo] = b.to_be_bytes();
        adu.extend_from_slice(&[self.slave(), self.function(), a_hi, a_lo, b_hi, b_lo])
            .map_err(|()| BusError::InvalidRequest)?;
        let [crc_lo, crc_hi] = crc16(&adu).to_le_bytes();
        adu.extend_from_slice(&[crc_lo, crc_hi])
            .map_err(|()| BusError::InvalidRequest)?;
        Ok(adu)
    }

    /// Total response length, decided from the function byte of the reply.
    pub fn response_len(&self, function_byte: u8) -> usize {
        if function_byte & EXCEPTION_FLAG != 0 {
            return EXCEPTION_LEN;
        }
        match *self {
            Self::ReadHoldingRegisters { count, .. } => 5 + 2 * usize::from(count),
            Self::WriteSingleRegister { .. } => 8,
        }
    }
}

/// A successfully decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Registers(Registers),
    Written { address: u16, value: u16 },
}

/// Validate `frame` as the answer to `request`.
///
/// Checks run in wire order of trust: length and CRC first, then slave
/// address, then function/exception, then payload.
pub fn decode_response(request: &Request, frame: &[u8]) -> Result<Response, ProtocolError> {
    if frame.len() < EXCEPTION_LEN {
        return Err(ProtocolError::Malformed);
    }
    let (body, trailer) = frame.split_at(frame.len() - 2);
    if crc16(body).to_le_bytes() != [trailer[0], trailer[1]] {
        return Err(ProtocolError::Crc);
    }
    if body[0] != request.slave() {
        return Err(ProtocolError::WrongSlave);
    }
    if body[1] == request.function() | EXCEPTION_FLAG {
        return Err(ProtocolError::Exception(body[2]));
    }
    if body[1] != request.function() {
        return Err(ProtocolError::WrongFunction);
    }
    if frame.len() != request.response_len(body[1]) {
        return Err(ProtocolError::Malformed);
    }

    match *request {
        Request::ReadHoldingRegisters { count, .. } => {
            if usize::from(body[2]) != 2 * usize::from(count) {
                return Err(ProtocolError::Malformed);
            }
            let mut regs = Registers::new();
            for pair in body[3..].chunks_exact(2) {
                regs.push(u16::from_be_bytes([pair[0], pair[1]]))
                    .map_err(|_| ProtocolError::Malformed)?;
            }
            Ok(Response::Registers(regs))
        }
        Request::WriteSingleRegister { address, value, .. } => {
            let echoed_address = u16::from_be_bytes([body[2], body[3]]);
            let echoed_value = u16::from_be_bytes([body[4], body[5]]);
            if echoed_address != address || echoed_value != value {
                return Err(ProtocolError::EchoMismatch);
            }
            Ok(Response::Written { address, value })
        }
    }
}
