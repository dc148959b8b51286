//! RAM Slave Tests.
//!
//! Wait states, byte-lane writes, error windows and the respond/clock split.

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvmem_core::common::ByteSel;
use rvmem_core::config::ErrorWindow;
use rvmem_core::soc::bus::{BusRequest, BusResponse};
use rvmem_core::soc::memory::Memory;
use rvmem_core::soc::traits::BusSlave;

use crate::common::harness::{RAM_BASE, RAM_SIZE, ram_config};

/// Clocks `req` until it is answered; returns the response and the cycles waited.
fn transfer(mem: &mut Memory, req: &BusRequest) -> (BusResponse, u32) {
    let mut waited = 0;
    loop {
        let resp = mem.respond(req);
        mem.clock(req);
        if resp.completes() {
            return (resp, waited);
        }
        waited += 1;
        assert!(waited < 100, "request never answered");
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(5)]
fn every_transfer_waits_latency_cycles(#[case] latency: u32) {
    let mut mem = Memory::new(&ram_config(latency, Vec::new())).unwrap();
    let _ = mem.poke(RAM_BASE + 8, 0xFEED);

    for _ in 0..3 {
        let (resp, waited) = transfer(&mut mem, &BusRequest::read(RAM_BASE + 8));
        assert_eq!(resp, BusResponse::ack(0xFEED));
        assert_eq!(waited, latency);
    }
}

#[test]
fn respond_has_no_side_effects() {
    let mut mem = Memory::new(&ram_config(0, Vec::new())).unwrap();
    let write = BusRequest::write(RAM_BASE, 0x1234, ByteSel::ALL);

    assert!(mem.respond(&write).ack);
    assert!(mem.respond(&write).ack);
    assert_eq!(mem.peek(RAM_BASE), Some(0));

    mem.clock(&write);
    assert_eq!(mem.peek(RAM_BASE), Some(0x1234));
}

#[test]
fn dropping_strobe_restarts_wait() {
    let mut mem = Memory::new(&ram_config(2, Vec::new())).unwrap();
    let req = BusRequest::read(RAM_BASE);
    mem.clock(&req);
    mem.clock(&BusRequest { stb: false, ..req });

    let (_, waited) = transfer(&mut mem, &req);
    assert_eq!(waited, 2);
}

#[rstest]
#[case::byte0(0b0001, 0x1122_33DD)]
#[case::byte3(0b1000, 0xAA22_3344)]
#[case::upper_half(0b1100, 0xAABB_3344)]
#[case::word(0b1111, 0xAABB_CCDD)]
#[case::none(0b0000, 0x1122_3344)]
fn write_updates_selected_lanes(#[case] sel: u8, #[case] expected: u32) {
    let mut mem = Memory::new(&ram_config(0, Vec::new())).unwrap();
    let addr = RAM_BASE + 0x40;
    let _ = mem.poke(addr, 0x1122_3344);

    let (resp, _) = transfer(&mut mem, &BusRequest::write(addr, 0xAABB_CCDD, ByteSel::from_bits(sel)));

    assert!(resp.ack);
    assert_eq!(mem.peek(addr), Some(expected));
}

#[test]
fn error_window_faults_reads_and_writes() {
    let window = ErrorWindow { start: RAM_BASE + 0x100, end: u64::from(RAM_BASE) + 0x200 };
    let mut mem = Memory::new(&ram_config(1, vec![window])).unwrap();
    let _ = mem.poke(RAM_BASE + 0x100, 0x77);

    let (resp, waited) = transfer(&mut mem, &BusRequest::read(RAM_BASE + 0x1FC));
    assert!(resp.err);
    assert_eq!(waited, 1);

    let (resp, _) = transfer(&mut mem, &BusRequest::write(RAM_BASE + 0x100, 0, ByteSel::ALL));
    assert!(resp.err);
    assert_eq!(mem.peek(RAM_BASE + 0x100), Some(0x77));

    let (resp, _) = transfer(&mut mem, &BusRequest::read(RAM_BASE + 0x200));
    assert!(resp.ack);
}

#[test]
fn outside_backing_store_faults() {
    let mut mem = Memory::new(&ram_config(0, Vec::new())).unwrap();
    assert!(transfer(&mut mem, &BusRequest::read(RAM_BASE + RAM_SIZE as u32)).0.err);
    assert!(transfer(&mut mem, &BusRequest::read(RAM_BASE - 4)).0.err);
    assert!(!mem.poke(RAM_BASE + RAM_SIZE as u32, 1));
}

#[test]
fn load_copies_words() {
    let mut mem = Memory::new(&ram_config(0, Vec::new())).unwrap();
    assert_eq!(mem.load(RAM_BASE + 0x20, &[7, 8]), 2);
    assert_eq!(mem.peek(RAM_BASE + 0x24), Some(8));
    assert_eq!(mem.size_bytes(), RAM_SIZE);
    assert_eq!(mem.name(), "RAM");
}

/// Words past either end of the backing store are skipped and not counted.
#[test]
fn load_skips_words_outside_backing_store() {
    let mut mem = Memory::new(&ram_config(0, Vec::new())).unwrap();
    let end = RAM_BASE + RAM_SIZE as u32;

    assert_eq!(mem.load(end - 8, &[1, 2, 3]), 2);
    assert_eq!(mem.peek(end - 8), Some(1));
    assert_eq!(mem.peek(end - 4), Some(2));
    assert_eq!(mem.peek(end), None);

    assert_eq!(mem.load(RAM_BASE - 4, &[9, 10]), 1);
    assert_eq!(mem.peek(RAM_BASE), Some(10));
}
