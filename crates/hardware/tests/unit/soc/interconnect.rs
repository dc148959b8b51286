//! Interconnect Tests.
//!
//! Routing between the two masters and the slave, bus accounting and
//! instruction/data coherency through the snoop ports.

use pretty_assertions::assert_eq;
use rvmem_core::common::ByteSel;
use rvmem_core::core::units::ifu::FetchInputs;
use rvmem_core::core::units::lsu::LsuInputs;
use rvmem_core::sim::{Simulator, Trace, TraceOp, TraceOutcome};
use rvmem_core::soc::bus::BusResponse;
use rvmem_core::soc::interconnect::MemorySystem;

use crate::common::harness::{RAM_BASE, fetch, load, pattern, patterned_simulator, run, scenario_cache, store};
use crate::common::mocks::bus::slave_with;

const SHARED: u32 = RAM_BASE + 0x100;

fn value(v: u32) -> TraceOutcome {
    TraceOutcome::Value { value: v }
}

// ══════════════════════════════════════════════════════════
// 1. Coherency
// ══════════════════════════════════════════════════════════

/// A store to a word held by both caches keeps the data copy (updated in
/// place) and invalidates the instruction copy, so the next fetch sees the
/// new value.
#[test]
fn data_store_invalidates_instruction_copy() {
    let mut sim = patterned_simulator(1);

    let report = run(
        &mut sim,
        vec![fetch(SHARED), load(SHARED), store(SHARED, 0x2222_2222), TraceOp::Fence],
    );

    assert_eq!(report.results[0].outcome, value(pattern(SHARED)));
    assert_eq!(report.results[1].outcome, value(pattern(SHARED)));
    let system = sim.system();
    assert_eq!(system.fetch().icache().lookup(SHARED), None);
    assert_eq!(system.lsu().dcache().peek(SHARED), Some(0x2222_2222));
    assert_eq!(system.memory().peek(SHARED), Some(0x2222_2222));
    assert_eq!(system.fetch().icache().stats().snoop_invalidations, 1);
    assert_eq!(system.lsu().dcache().stats().snoop_invalidations, 0);
    assert_eq!(system.lsu().dcache().stats().self_snoops_suppressed, 1);

    let report = run(&mut sim, vec![fetch(SHARED)]);
    assert_eq!(report.results[0].outcome, value(0x2222_2222));
}

#[test]
fn store_to_other_line_keeps_instruction_copy() {
    let mut sim = patterned_simulator(0);

    let _ = run(&mut sim, vec![fetch(SHARED), store(SHARED + 0x20, 5), TraceOp::Fence]);

    assert_eq!(sim.system().fetch().icache().lookup(SHARED), Some(0));
    assert_eq!(sim.system().memory().peek(SHARED + 0x20), Some(5));
}

// ══════════════════════════════════════════════════════════
// 2. Routing and accounting
// ══════════════════════════════════════════════════════════

#[test]
fn bus_transfers_are_attributed_to_ports() {
    let mut sim = patterned_simulator(0);

    let _ = run(&mut sim, vec![fetch(SHARED), load(SHARED + 0x400), store(SHARED + 0x800, 1)]);

    let bus = sim.system().stats();
    // Two line refills and one write-through.
    assert_eq!(bus.instruction_port_transfers, 8);
    assert_eq!(bus.data_port_transfers, 9);
    assert_eq!(bus.acks, 17);
    assert_eq!(bus.errors, 0);
    assert!(bus.busy_cycles >= bus.acks);
}

/// Simultaneous misses on both ports: the data refill wins arbitration and
/// keeps the bus for its whole line before the instruction refill starts.
#[test]
fn data_refill_wins_over_concurrent_instruction_refill() {
    let mut sim = patterned_simulator(0);
    let system = sim.system_mut();
    let ipc = RAM_BASE + 0x200;
    let daddr = RAM_BASE + 0x1400;

    let _ = system.tick(
        &FetchInputs { a_pc: ipc, a_valid: true, ..FetchInputs::default() },
        &LsuInputs { x_addr: daddr, x_byte_sel: ByteSel::ALL, x_load: true, x_valid: true, ..LsuInputs::default() },
    );

    let mut fetch_f = FetchInputs { a_pc: ipc, f_pc: ipc, f_valid: true, ..FetchInputs::default() };
    let mut load_m = LsuInputs { x_addr: daddr, m_addr: daddr, m_load: true, m_valid: true, ..LsuInputs::default() };
    let (mut instruction, mut data) = (None, None);
    let mut owners = Vec::new();
    let mut overlapped = false;

    for _ in 0..60 {
        let (unstalled, _) = system.evaluate(&fetch_f, &load_m);
        let f_stall = fetch_f.f_valid && unstalled.fetch.f_busy;
        let m_stall = load_m.m_valid && unstalled.lsu.m_busy;
        let fetch = FetchInputs { a_stall: f_stall, f_stall, ..fetch_f };
        let lsu = LsuInputs { x_stall: m_stall, m_stall, ..load_m };

        let (out, update) = system.evaluate(&fetch, &lsu);
        overlapped |= out.lsu.dport.cyc && out.fetch.iport.cyc;
        if out.response.ack {
            owners.push(system.arbiter().owner().map(|p| p.index()));
        }
        system.commit(update);

        if fetch_f.f_valid && !f_stall {
            instruction = Some(out.fetch.f_instruction);
            fetch_f.f_valid = false;
        }
        if load_m.m_valid && !m_stall {
            data = Some(out.lsu.m_load_data);
            load_m.m_valid = false;
        }
    }

    assert!(overlapped, "both ports never requested together");
    let expected: Vec<Option<usize>> = [Some(0); 8].into_iter().chain([Some(1); 8]).collect();
    assert_eq!(owners, expected);
    assert_eq!(instruction, Some(pattern(ipc)));
    assert_eq!(data, Some(pattern(daddr)));
    assert_eq!(system.stats().data_port_transfers, 8);
    assert_eq!(system.stats().instruction_port_transfers, 8);
}

#[test]
fn idle_system_leaves_bus_idle() {
    let mut sim = patterned_simulator(0);
    let system = sim.system_mut();

    let out = system.tick(&FetchInputs::default(), &LsuInputs::default());

    assert!(!out.bus.cyc);
    assert_eq!(out.response, BusResponse::NONE);
    assert_eq!(system.arbiter().owner(), None);
    assert_eq!(system.stats().busy_cycles, 0);
}

/// Uncached accesses reach an arbitrary slave on both ports.
#[test]
fn custom_slave_serves_both_ports() {
    let slave = slave_with(|req| {
        if !req.is_strobed() {
            BusResponse::NONE
        } else if req.we {
            BusResponse::ack(0)
        } else {
            BusResponse::ack(0xCAFE_F00D)
        }
    });
    let system = MemorySystem::with_slave(&scenario_cache(false), &scenario_cache(true), slave).unwrap();
    let mut sim = Simulator::with_system(system, 1_000);

    let report = run(&mut sim, vec![load(0x1000_0000), fetch(0x1000_0004), store(0x1000_0008, 3)]);

    let outcomes: Vec<TraceOutcome> = report.results.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![value(0xCAFE_F00D), value(0xCAFE_F00D), TraceOutcome::Done]);
    assert!(report.faults.is_empty());
    assert_eq!(sim.system().stats().acks, 3);
}

#[test]
fn silent_slave_hits_cycle_limit() {
    let system =
        MemorySystem::with_slave(&scenario_cache(false), &scenario_cache(true), slave_with(|_| BusResponse::NONE))
            .unwrap();
    let mut sim = Simulator::with_system(system, 50);

    let err = sim.run(&Trace::from(vec![load(0x1000_0000)])).unwrap_err();

    assert!(matches!(err, rvmem_core::common::SimError::CycleLimit { limit: 50 }));
}
