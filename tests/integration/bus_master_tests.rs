//! Integration tests: BusMaster ↔ simulated RTU slaves.

use clinipower::bus::{BusMaster, BusTiming, retry_on_timeout};
use clinipower::error::{BusError, ProtocolError};

use super::mock_hw::{DirectionPin, SimBus};

const PLC: u8 = 1;
const METER: u8 = 7;

fn master(bus: SimBus) -> BusMaster<SimBus, DirectionPin> {
    BusMaster::new(bus, DirectionPin::default(), BusTiming::default()).unwrap()
}

fn two_slaves() -> SimBus {
    SimBus::new()
        .with_slave(PLC, &[(0, 0), (1, 230), (2, 0), (3, 80), (4, 0), (200, 0)])
        .with_slave(METER, &[(10, 0x1234), (11, 0xABCD)])
}

#[test]
fn reads_from_each_addressed_slave() {
    let mut m = master(two_slaves());
    let status = m.read_holding_registers(PLC, 1, 4).unwrap();
    assert_eq!(status.as_slice(), &[230, 0, 80, 0]);
    let meter = m.read_holding_registers(METER, 10, 2).unwrap();
    assert_eq!(meter.as_slice(), &[0x1234, 0xABCD]);
    assert_eq!(m.link().requests.len(), 2);
}

#[test]
fn written_register_reads_back() {
    let mut m = master(two_slaves());
    m.write_single_register(PLC, 200, 3).unwrap();
    assert_eq!(m.link().register(PLC, 200), Some(3));
    let regs = m.read_holding_registers(PLC, 200, 1).unwrap();
    assert_eq!(regs.as_slice(), &[3]);
}

#[test]
fn request_on_the_wire_is_exact() {
    let mut m = master(SimBus::new().with_slave(1, &[(0, 1)]));
    m.read_holding_registers(1, 0, 1).unwrap();
    assert_eq!(m.link().requests[0], [0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]);
}

#[test]
fn driver_is_enabled_only_around_each_request() {
    let mut m = master(two_slaves());
    m.write_single_register(PLC, 200, 2).unwrap();
    m.read_holding_registers(PLC, 0, 1).unwrap();
    assert_eq!(m.direction().edges, [false, true, false, true, false]);
}

#[test]
fn silent_slave_times_out_in_receive_mode() {
    let mut m = master(two_slaves());
    let err = m.read_holding_registers(42, 0, 1).unwrap_err();
    assert_eq!(err, BusError::Timeout);
    assert!(!m.direction().is_high());
    assert_eq!(m.link().windows, [BusTiming::default().response_timeout_ms]);
}

#[test]
fn missing_register_is_an_exception() {
    let mut m = master(two_slaves());
    let err = m.read_holding_registers(METER, 50, 1).unwrap_err();
    assert_eq!(err, BusError::Protocol(ProtocolError::Exception(0x02)));
}

#[test]
fn retry_gives_up_on_a_silent_slave() {
    let mut m = master(two_slaves());
    let result = retry_on_timeout(2, || m.write_single_register(42, 200, 1));
    assert_eq!(result, Err(BusError::Timeout));
    assert_eq!(m.link().requests.len(), 3);
}

#[test]
fn slave_recovers_between_retries() {
    let mut m = master(SimBus::new());
    let mut attempts = 0;
    let result = retry_on_timeout(3, || {
        attempts += 1;
        if attempts == 2 {
            m.link_mut().set_register(PLC, 200, 0);
        }
        m.write_single_register(PLC, 200, 4)
    });
    assert_eq!(result, Ok(()));
    assert_eq!(attempts, 2);
    assert_eq!(m.link().register(PLC, 200), Some(4));
}

#[test]
fn broadcast_and_oversized_reads_never_reach_the_wire() {
    let mut m = master(two_slaves());
    assert_eq!(m.read_holding_registers(0, 0, 1), Err(BusError::InvalidRequest));
    assert_eq!(m.read_holding_registers(PLC, 0, 126), Err(BusError::InvalidRequest));
    assert_eq!(m.write_single_register(0, 200, 1), Err(BusError::InvalidRequest));
    assert!(m.link().requests.is_empty());
    assert_eq!(m.direction().edges, [false]);
}
