//! Snoop Port Tests.
//!
//! Committed writes seen on the shared bus invalidate matching lines; a
//! cache's own writes, uncommitted traffic and reads are ignored. A write to
//! the line being refilled cancels the refill, which then restarts.

use pretty_assertions::assert_eq;
use rvmem_core::core::units::cache::{CacheInputs, RefillState};
use rvmem_core::soc::bus::SnoopPort;

use crate::common::harness::{CacheRig, RAM_BASE, committed_write, pattern, scenario_cache};

const LINE_A: u32 = RAM_BASE + 0x40;
const LINE_B: u32 = RAM_BASE + 0x1040;

fn warmed_rig() -> CacheRig {
    let mut rig = CacheRig::new(&scenario_cache(true), 0);
    let _ = rig.load(LINE_A);
    assert_eq!(rig.cache.lookup(LINE_A), Some(0));
    rig
}

#[test]
fn peer_write_invalidates_line() {
    let mut rig = warmed_rig();

    rig.snoop(committed_write(LINE_A + 8), SnoopPort::IDLE);

    assert_eq!(rig.cache.lookup(LINE_A), None);
    assert_eq!(rig.cache.stats().snoop_invalidations, 1);
}

#[test]
fn own_write_is_not_snooped() {
    let mut rig = warmed_rig();

    rig.snoop(committed_write(LINE_A), committed_write(LINE_A));

    assert_eq!(rig.cache.lookup(LINE_A), Some(0));
    assert_eq!(rig.cache.stats().snoop_invalidations, 0);
    assert_eq!(rig.cache.stats().self_snoops_suppressed, 1);
}

#[test]
fn own_write_elsewhere_does_not_suppress() {
    let mut rig = warmed_rig();

    rig.snoop(committed_write(LINE_A), committed_write(LINE_A + 4));

    assert_eq!(rig.cache.lookup(LINE_A), None);
}

#[test]
fn uncommitted_traffic_is_ignored() {
    let mut rig = warmed_rig();
    let pending = SnoopPort { ack: false, ..committed_write(LINE_A) };
    let read = SnoopPort { we: false, ..committed_write(LINE_A) };
    let idle_strobe = SnoopPort { valid: false, ..committed_write(LINE_A) };

    for snoop in [pending, read, idle_strobe] {
        rig.snoop(snoop, SnoopPort::IDLE);
        assert_eq!(rig.cache.lookup(LINE_A), Some(0), "{snoop:?}");
    }
}

#[test]
fn write_to_other_tag_keeps_line() {
    let mut rig = warmed_rig();

    rig.snoop(committed_write(LINE_B), SnoopPort::IDLE);
    rig.snoop(committed_write(0x1000_0040), SnoopPort::IDLE);

    assert_eq!(rig.cache.lookup(LINE_A), Some(0));
}

#[test]
fn snoop_and_hit_in_same_cycle() {
    let mut rig = warmed_rig();
    rig.address_phase(LINE_A);

    let out = rig.cycle(CacheInputs {
        s2_addr: LINE_A,
        s2_valid: true,
        s2_access: true,
        s2_re: true,
        snoop: committed_write(LINE_A),
        ..CacheInputs::default()
    });

    // The lookup completes on the old contents; the line is gone afterwards.
    assert!(!out.s2_miss);
    assert_eq!(out.s2_rdata, pattern(LINE_A));
    assert_eq!(rig.cache.lookup(LINE_A), None);
}

/// A peer write to the line being filled aborts the refill; the still-stalled
/// load misses again and refetches the whole line.
#[test]
fn peer_write_cancels_refill_of_same_line() {
    let mut rig = CacheRig::new(&scenario_cache(true), 1);
    let addr = RAM_BASE + 0x40;
    let mut fired = false;

    let (data, _) = rig.load_with(addr, |beats, i| {
        if beats == 2 && !fired {
            fired = true;
            CacheInputs { snoop: committed_write(addr + 4), ..i }
        } else {
            i
        }
    });

    assert!(fired);
    assert_eq!(data, pattern(addr));
    let stats = rig.cache.stats();
    assert_eq!(stats.refills_started, 2);
    assert_eq!(stats.refills_aborted, 1);
    assert_eq!(stats.refills_completed, 1);
    assert_eq!(rig.cache.lookup(addr), Some(0));
}

#[test]
fn cancelled_refill_restarts_without_recovery() {
    let mut rig = CacheRig::new(&scenario_cache(true), 1);
    let addr = RAM_BASE + 0x40;
    let access = CacheInputs { s2_addr: addr, s2_valid: true, s2_access: true, s2_re: true, ..CacheInputs::default() };
    rig.address_phase(addr);

    while rig.beats.len() < 2 {
        let stall = rig.would_miss(access);
        let _ = rig.cycle(CacheInputs { s2_stall: stall, ..access });
    }
    assert_eq!(rig.cache.refill_state(), RefillState::Refill);

    let cancel = CacheInputs { snoop: committed_write(addr + 4), ..access };
    let stall = rig.would_miss(cancel);
    let _ = rig.cycle(CacheInputs { s2_stall: stall, ..cancel });
    assert_eq!(rig.cache.refill_state(), RefillState::Read);
    assert_eq!(rig.cache.stats().refills_aborted, 1);

    // The stalled access misses again on the very next cycle.
    assert!(rig.would_miss(access));
    let _ = rig.cycle(CacheInputs { s2_stall: true, ..access });
    assert_eq!(rig.cache.refill_state(), RefillState::Refill);
    assert_eq!(rig.cache.stats().refills_started, 2);
}

#[test]
fn peer_write_to_other_line_does_not_cancel_refill() {
    let mut rig = CacheRig::new(&scenario_cache(true), 0);
    let addr = RAM_BASE + 0x80;

    let _ = rig.load_with(addr, |beats, i| if beats == 3 { CacheInputs { snoop: committed_write(LINE_B), ..i } } else { i });

    let stats = rig.cache.stats();
    assert_eq!(stats.refills_started, 1);
    assert_eq!(stats.refills_aborted, 0);
    assert_eq!(rig.cache.lookup(addr), Some(0));
}
