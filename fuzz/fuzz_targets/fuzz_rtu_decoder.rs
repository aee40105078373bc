//! Fuzz target: `decode_response` (Modbus RTU reply parser)
//!
//! The first 5 bytes choose the request the reply is matched against; the
//! rest is fed to the decoder as the received frame.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - An accepted read reply carries exactly `count` registers
//! - An accepted frame always ends in a valid CRC
//!
//! cargo fuzz run fuzz_rtu_decoder

#![no_main]

use clinipower::bus::frame::{Request, Response, crc16, decode_response};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }
    let (head, frame) = data.split_at(5);
    let slave = head[0];
    let address = u16::from_be_bytes([head[1], head[2]]);
    let operand = u16::from_be_bytes([head[3], head[4]]);
    let request = if slave & 1 == 0 {
        Request::ReadHoldingRegisters {
            slave,
            address,
            count: operand % 126,
        }
    } else {
        Request::WriteSingleRegister {
            slave,
            address,
            value: operand,
        }
    };

    if let Ok(response) = decode_response(&request, frame) {
        let body = &frame[..frame.len() - 2];
        assert_eq!(
            crc16(body).to_le_bytes(),
            [frame[frame.len() - 2], frame[frame.len() - 1]],
            "accepted frame with bad CRC"
        );
        if let (Request::ReadHoldingRegisters { count, .. }, Response::Registers(regs)) =
            (request, response)
        {
            assert_eq!(regs.len(), usize::from(count));
        }
    }
});
