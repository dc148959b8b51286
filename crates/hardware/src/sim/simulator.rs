//! Trace-Driven Simulator.
//!
//! Replays a [`Trace`] through a [`MemorySystem`] one clock cycle at a time. It models:
//! 1. **Data Pipeline:** An execute/memory stage pair in front of the load/store
//!    unit. A stage holds while its unit reports busy; a memory-stage stall
//!    also holds the execute stage.
//! 2. **Fetch Pipeline:** An address/fetch stage pair in front of the fetch unit.
//! 3. **Ordering:** Operations issue in trace order. A data operation issues
//!    only once the fetch pipeline is empty and vice versa, so effects across
//!    the two sides are observed in program order.
//! 4. **Fences:** `fence` and `fence.i` travel down the data pipeline and hold
//!    in execute until the store buffer is empty. `fence.i` flushes the
//!    instruction cache as it leaves execute.
//! 5. **Faults:** Errors reported by the completing operation become its
//!    outcome; every latched error is also recorded as a [`FaultRecord`].
//! 6. **Drain:** After the last operation the system runs until the store
//!    buffer is empty and both bus ports are idle.
//!
//! Each cycle is evaluated twice: once with no stalls to read the busy
//! outputs, which do not depend on the stall inputs, and once with the
//! resulting stalls before committing.

use serde::Serialize;
use tracing::{debug, trace};

use crate::common::{ByteSel, ConfigError, Fault, FaultKind, SimError};
use crate::config::Config;
use crate::core::units::ifu::{FetchInputs, FetchOutputs};
use crate::core::units::lsu::format::{byte_sel, is_misaligned, load_data, store_data};
use crate::core::units::lsu::{LsuInputs, LsuOutputs};
use crate::sim::trace::{FaultRecord, Trace, TraceOp, TraceOutcome, TraceResult};
use crate::soc::interconnect::MemorySystem;
use crate::soc::memory::Memory;
use crate::soc::traits::BusSlave;
use crate::stats::MemStats;

/// An operation occupying a pipeline stage.
#[derive(Clone, Copy, Debug)]
struct Slot {
    index: usize,
    op: TraceOp,
}

/// Results of one [`Simulator::run`].
#[derive(Clone, Debug, Serialize)]
pub struct SimReport {
    /// One record per operation, in trace order.
    pub results: Vec<TraceResult>,
    /// Every bus error latched during the run.
    pub faults: Vec<FaultRecord>,
    /// Statistics accumulated since the simulator was built.
    pub stats: MemStats,
}

/// Cycle-level trace simulator.
#[derive(Debug)]
pub struct Simulator<S: BusSlave = Memory> {
    system: MemorySystem<S>,
    max_cycles: u64,
    cycle: u64,
    x: Option<Slot>,
    m: Option<Slot>,
    a: Option<Slot>,
    f: Option<Slot>,
    lsu_fault: Option<Fault>,
    fetch_fault: Option<Fault>,
    ops_completed: u64,
    stalls_fetch: u64,
    stalls_data: u64,
}

impl Simulator<Memory> {
    /// Builds the memory system described by `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - System configuration; `general.max_cycles` bounds each run.
    ///
    /// # Returns
    ///
    /// The simulator, or the first configuration error found.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::with_system(MemorySystem::new(config)?, config.general.max_cycles))
    }
}

impl<S: BusSlave> Simulator<S> {
    /// Wraps an existing memory system.
    pub const fn with_system(system: MemorySystem<S>, max_cycles: u64) -> Self {
        Self {
            system,
            max_cycles,
            cycle: 0,
            x: None,
            m: None,
            a: None,
            f: None,
            lsu_fault: None,
            fetch_fault: None,
            ops_completed: 0,
            stalls_fetch: 0,
            stalls_data: 0,
        }
    }

    /// Replaces the per-run cycle budget.
    #[must_use]
    pub const fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// The simulated memory system.
    pub const fn system(&self) -> &MemorySystem<S> {
        &self.system
    }

    /// The simulated memory system, for preloading memory between runs.
    pub const fn system_mut(&mut self) -> &mut MemorySystem<S> {
        &mut self.system
    }

    /// Cycles simulated so far.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Statistics accumulated since the simulator was built.
    pub fn stats(&self) -> MemStats {
        MemStats {
            cycles: self.cycle,
            ops_completed: self.ops_completed,
            icache: *self.system.fetch().icache().stats(),
            dcache: *self.system.lsu().dcache().stats(),
            bus: *self.system.stats(),
            store_buffer: *self.system.lsu().stats(),
            stalls_fetch: self.stalls_fetch,
            stalls_data: self.stalls_data,
        }
    }

    /// Runs `trace` to completion.
    ///
    /// Cache contents and statistics carry over between runs.
    ///
    /// # Arguments
    ///
    /// * `trace` - Operations in program order.
    ///
    /// # Returns
    ///
    /// The report, or `SimError::CycleLimit` if the trace has not drained
    /// within the cycle budget.
    pub fn run(&mut self, trace: &Trace) -> Result<SimReport, SimError> {
        let ops = &trace.ops;
        let start = self.cycle;
        let mut next = 0;
        let mut idle: Option<(Slot, u32)> = None;
        let mut results = Vec::with_capacity(ops.len());
        let mut faults = Vec::new();

        debug!(ops = ops.len(), max_cycles = self.max_cycles, "trace run started");

        loop {
            if next == ops.len() && idle.is_none() && self.pipelines_empty() && self.is_quiescent() {
                break;
            }
            if self.cycle - start >= self.max_cycles {
                return Err(SimError::CycleLimit { limit: self.max_cycles });
            }

            if idle.is_none()
                && let Some(&op) = ops.get(next)
            {
                let slot = Slot { index: next, op };
                let issued = match op {
                    TraceOp::Load { addr, width, .. } | TraceOp::Store { addr, width, .. }
                        if is_misaligned(width, addr) =>
                    {
                        results.push(self.complete(slot, TraceOutcome::Misaligned));
                        true
                    }
                    TraceOp::Load { .. } | TraceOp::Store { .. } | TraceOp::Fence | TraceOp::FlushICache => {
                        let ready = self.x.is_none() && self.a.is_none() && self.f.is_none();
                        if ready {
                            self.x = Some(slot);
                        }
                        ready
                    }
                    TraceOp::Fetch { .. } => {
                        let ready = self.a.is_none() && self.x.is_none() && self.m.is_none();
                        if ready {
                            self.a = Some(slot);
                        }
                        ready
                    }
                    TraceOp::Idle { cycles } => {
                        let ready = self.pipelines_empty();
                        if ready {
                            if cycles == 0 {
                                results.push(self.complete(slot, TraceOutcome::Done));
                            } else {
                                idle = Some((slot, cycles));
                            }
                        }
                        ready
                    }
                };
                if issued {
                    next += 1;
                }
            }

            let (unstalled, _) = self.system.evaluate(&self.fetch_inputs(false, false, false), &self.lsu_inputs(false, false));
            let m_stall = self.m.is_some() && unstalled.lsu.m_busy;
            let x_stall = m_stall || (self.x.is_some() && unstalled.lsu.x_busy);
            let f_stall = self.f.is_some() && unstalled.fetch.f_busy;
            let a_stall = f_stall;
            let flush = !x_stall && matches!(self.x, Some(Slot { op: TraceOp::FlushICache, .. }));

            let (out, update) =
                self.system.evaluate(&self.fetch_inputs(flush, a_stall, f_stall), &self.lsu_inputs(x_stall, m_stall));
            self.system.commit(update);

            self.record_faults(&out.lsu, &out.fetch, &mut faults);
            if (self.x.is_some() && x_stall) || (self.m.is_some() && m_stall) {
                self.stalls_data += 1;
            }
            if (self.a.is_some() && a_stall) || (self.f.is_some() && f_stall) {
                self.stalls_fetch += 1;
            }

            if !m_stall && let Some(slot) = self.m.take() {
                let outcome = self.data_outcome(slot.op, &out.lsu);
                results.push(self.complete(slot, outcome));
            }
            if !x_stall {
                self.m = self.x.take();
            }
            if !f_stall && let Some(slot) = self.f.take() {
                let outcome = fetch_outcome(&out.fetch);
                results.push(self.complete(slot, outcome));
            }
            if !a_stall {
                self.f = self.a.take();
            }

            if let Some((slot, left)) = idle {
                if left <= 1 {
                    results.push(self.complete(slot, TraceOutcome::Done));
                    idle = None;
                } else {
                    idle = Some((slot, left - 1));
                }
            }

            self.cycle += 1;
        }

        results.sort_by_key(|r| r.index);
        debug!(cycles = self.cycle - start, faults = faults.len(), "trace run finished");
        Ok(SimReport { results, faults, stats: self.stats() })
    }

    const fn pipelines_empty(&self) -> bool {
        self.x.is_none() && self.m.is_none() && self.a.is_none() && self.f.is_none()
    }

    fn is_quiescent(&self) -> bool {
        self.system.lsu().store_buffer().is_empty()
            && !self.system.lsu().bus_request().cyc
            && !self.system.fetch().bus_request().cyc
    }

    fn complete(&mut self, slot: Slot, outcome: TraceOutcome) -> TraceResult {
        self.ops_completed += 1;
        trace!(index = slot.index, op = ?slot.op, outcome = ?outcome, cycle = self.cycle, "operation completed");
        TraceResult { index: slot.index, op: slot.op, cycle: self.cycle, outcome }
    }

    fn record_faults(&mut self, lsu: &LsuOutputs, fetch: &FetchOutputs, faults: &mut Vec<FaultRecord>) {
        for (latched, seen) in [(lsu.fault(), &mut self.lsu_fault), (fetch.fault(), &mut self.fetch_fault)] {
            if let Some(fault) = latched
                && *seen != latched
            {
                faults.push(FaultRecord { cycle: self.cycle, fault });
            }
            *seen = latched;
        }
    }

    fn data_outcome(&self, op: TraceOp, out: &LsuOutputs) -> TraceOutcome {
        match op {
            TraceOp::Load { .. } if out.m_load_error => {
                TraceOutcome::Fault { fault: Fault { kind: FaultKind::Load, addr: out.m_badaddr } }
            }
            TraceOp::Load { addr, width, signed } => {
                TraceOutcome::Value { value: load_data(width, signed, addr, out.m_load_data) }
            }
            TraceOp::Store { addr, .. } if out.m_store_error && !self.system.lsu().dcache().is_cacheable(addr) => {
                TraceOutcome::Fault { fault: Fault { kind: FaultKind::Store, addr: out.m_badaddr } }
            }
            _ => TraceOutcome::Done,
        }
    }

    fn lsu_inputs(&self, x_stall: bool, m_stall: bool) -> LsuInputs {
        let x = DataSignals::of(self.x);
        let m = DataSignals::of(self.m);
        LsuInputs {
            x_addr: x.addr,
            x_data_w: x.data,
            x_byte_sel: x.sel,
            x_load: x.load,
            x_store: x.store,
            x_valid: x.valid,
            x_stall,
            x_fence: x.fence,
            m_addr: m.addr,
            m_load: m.load,
            m_store: m.store,
            m_valid: m.valid,
            m_stall,
            m_kill: false,
            ..LsuInputs::default()
        }
    }

    fn fetch_inputs(&self, flush: bool, a_stall: bool, f_stall: bool) -> FetchInputs {
        let pc = |slot: Option<Slot>| match slot {
            Some(Slot { op: TraceOp::Fetch { addr }, .. }) => Some(addr),
            _ => None,
        };
        let (a_pc, f_pc) = (pc(self.a), pc(self.f));
        FetchInputs {
            a_pc: a_pc.unwrap_or(0),
            a_valid: a_pc.is_some(),
            a_stall,
            f_pc: f_pc.unwrap_or(0),
            f_valid: f_pc.is_some(),
            f_stall,
            f_kill: false,
            flush,
            ..FetchInputs::default()
        }
    }
}

fn fetch_outcome(out: &FetchOutputs) -> TraceOutcome {
    match out.fault() {
        Some(fault) => TraceOutcome::Fault { fault },
        None => TraceOutcome::Value { value: out.f_instruction },
    }
}

/// Pipeline-register view of a data-side stage.
#[derive(Clone, Copy, Debug, Default)]
struct DataSignals {
    addr: u32,
    data: u32,
    sel: ByteSel,
    load: bool,
    store: bool,
    fence: bool,
    valid: bool,
}

impl DataSignals {
    fn of(slot: Option<Slot>) -> Self {
        match slot.map(|s| s.op) {
            Some(TraceOp::Load { addr, width, .. }) => {
                Self { addr, sel: byte_sel(width, addr), load: true, valid: true, ..Self::default() }
            }
            Some(TraceOp::Store { addr, data, width }) => Self {
                addr,
                data: store_data(width, data),
                sel: byte_sel(width, addr),
                store: true,
                valid: true,
                ..Self::default()
            },
            Some(TraceOp::Fence | TraceOp::FlushICache) => Self { fence: true, valid: true, ..Self::default() },
            _ => Self::default(),
        }
    }
}
