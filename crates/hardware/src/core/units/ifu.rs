//! Instruction Fetch Unit (IFU).
//!
//! The instruction-side counterpart of the load/store unit. It provides:
//! 1. **Instruction Cache:** Read-only, every valid fetch is a read.
//! 2. **Bypass Port:** Single outstanding read for non-cacheable addresses.
//! 3. **Arbitration:** Cache refill before bypass on the instruction bus.
//! 4. **Fault Handling:** A bus error is latched with its address and a NOP is
//!    delivered in place of the instruction.
//! 5. **Flush:** `fence.i` invalidates the whole instruction cache.

use tracing::debug;

use crate::common::{ConfigError, Fault, FaultKind, first_match};
use crate::config::CacheConfig;
use crate::core::units::cache::{Cache, CacheInputs, CacheUpdate};
use crate::soc::arbiter::{Arbiter, Grant, PortId};
use crate::soc::bus::{BusRequest, BusResponse, SnoopPort};

/// `addi x0, x0, 0`.
pub const NOP: u32 = 0x0000_0013;

/// Arbitration priority of the instruction cache refill port.
pub const REFILL_PRIORITY: u32 = 0;
/// Arbitration priority of the bypass port.
pub const BYPASS_PRIORITY: u32 = 1;

/// Pipeline and bus inputs of one cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchInputs {
    /// Address-stage program counter.
    pub a_pc: u32,
    /// Address stage valid.
    pub a_valid: bool,
    /// Address stage stalled.
    pub a_stall: bool,

    /// Fetch-stage program counter.
    pub f_pc: u32,
    /// Fetch stage valid.
    pub f_valid: bool,
    /// Fetch stage stalled.
    pub f_stall: bool,
    /// Fetch stage killed.
    pub f_kill: bool,

    /// Invalidate the instruction cache (`fence.i`).
    pub flush: bool,

    /// Instruction-bus response.
    pub iport: BusResponse,
    /// Shared-bus traffic for the instruction cache snoop port.
    pub snoop: SnoopPort,
}

/// Outputs of one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchOutputs {
    /// Fetched instruction word.
    pub f_instruction: u32,
    /// The fetch stage must wait.
    pub f_busy: bool,
    /// A fetch bus error is latched.
    pub f_bus_error: bool,
    /// Address of the erroring transaction.
    pub f_badaddr: u32,
    /// Instruction-bus request.
    pub iport: BusRequest,
}

impl FetchOutputs {
    /// The latched bus error, if any.
    pub const fn fault(&self) -> Option<Fault> {
        if self.f_bus_error { Some(Fault { kind: FaultKind::Fetch, addr: self.f_badaddr }) } else { None }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct FetchRegisters {
    f_use_cache: bool,
    bypass: BusRequest,
    bypass_rdata: u32,
    bus_error: bool,
    badaddr: u32,
}

/// State changes produced by [`FetchUnit::evaluate`].
#[derive(Clone, Debug)]
pub struct FetchUpdate {
    regs: FetchRegisters,
    cache: CacheUpdate,
    grant: Grant,
}

/// Cached instruction fetch unit.
#[derive(Debug)]
pub struct FetchUnit {
    icache: Cache,
    arbiter: Arbiter,
    refill_id: PortId,
    bypass_id: PortId,
    regs: FetchRegisters,
}

impl FetchUnit {
    /// Creates the unit around an instruction cache built from `config`.
    ///
    /// The cache is always read-only.
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        let icache = Cache::new(&CacheConfig { enable_write: false, ..config.clone() })?.named("icache");
        let mut arbiter = Arbiter::new();
        let refill_id = arbiter.add_port(REFILL_PRIORITY)?;
        let bypass_id = arbiter.add_port(BYPASS_PRIORITY)?;
        Ok(Self { icache, arbiter, refill_id, bypass_id, regs: FetchRegisters::default() })
    }

    /// Instruction cache.
    pub const fn icache(&self) -> &Cache {
        &self.icache
    }

    fn requests(&self) -> [BusRequest; 2] {
        let mut reqs = [BusRequest::IDLE; 2];
        reqs[self.refill_id.index()] = self.icache.bus_request();
        reqs[self.bypass_id.index()] = self.regs.bypass;
        reqs
    }

    /// Instruction-bus request, from registers only.
    pub fn bus_request(&self) -> BusRequest {
        self.arbiter.bus_request(&self.requests())
    }

    /// Evaluates one cycle without changing state.
    pub fn evaluate(&self, i: &FetchInputs) -> (FetchOutputs, FetchUpdate) {
        let r = &self.regs;
        let requests = self.requests();
        let iport = self.arbiter.bus_request(&requests);
        let refill_resp = self.arbiter.response_for(self.refill_id, i.iport);
        let bypass_resp = self.arbiter.response_for(self.bypass_id, i.iport);

        let a_use_cache = self.icache.is_cacheable(i.a_pc);

        let (cache_out, cache_update) = self.icache.evaluate(&CacheInputs {
            s1_addr: i.a_pc,
            s1_valid: i.a_valid && a_use_cache,
            s1_stall: i.a_stall,
            s1_access: true,
            s1_flush: i.flush,
            s2_addr: i.f_pc,
            s2_valid: i.f_valid && r.f_use_cache,
            s2_stall: i.f_stall,
            s2_kill: i.f_kill,
            s2_access: true,
            s2_re: true,
            bus: refill_resp,
            snoop: i.snoop,
            self_snoop: SnoopPort::observe(&iport, &i.iport),
            ..CacheInputs::default()
        });

        let (bypass, bypass_rdata) = if r.bypass.cyc {
            if bypass_resp.completes() || !i.f_valid {
                (BusRequest::IDLE, bypass_resp.dat_r)
            } else {
                (r.bypass, r.bypass_rdata)
            }
        } else if i.a_valid && !i.a_stall && !a_use_cache {
            (BusRequest::read(i.a_pc), r.bypass_rdata)
        } else {
            (r.bypass, r.bypass_rdata)
        };

        let (bus_error, badaddr) = first_match(
            &[(iport.cyc && i.iport.err, (true, iport.addr)), (!i.f_stall, (false, r.badaddr))],
            (r.bus_error, r.badaddr),
        );

        let (f_instruction, f_busy) = first_match(
            &[(r.bus_error, (NOP, false)), (r.f_use_cache, (cache_out.s2_rdata, cache_out.s2_miss))],
            (r.bypass_rdata, r.bypass.cyc),
        );

        let outputs = FetchOutputs {
            f_instruction,
            f_busy,
            f_bus_error: r.bus_error,
            f_badaddr: r.badaddr,
            iport,
        };
        let update = FetchUpdate {
            regs: FetchRegisters {
                f_use_cache: if i.a_stall { r.f_use_cache } else { a_use_cache },
                bypass,
                bypass_rdata,
                bus_error,
                badaddr,
            },
            cache: cache_update,
            grant: self.arbiter.next_grant(&requests),
        };
        (outputs, update)
    }

    /// Applies `update` at the clock edge.
    pub fn commit(&mut self, update: FetchUpdate) {
        let FetchUpdate { regs, cache, grant } = update;
        self.icache.commit(cache);
        self.arbiter.commit(grant);
        if regs.bus_error && !self.regs.bus_error {
            debug!(addr = format_args!("{:#010x}", regs.badaddr), "instruction bus error latched");
        }
        self.regs = regs;
    }

    /// Evaluates and commits one cycle.
    pub fn tick(&mut self, inputs: &FetchInputs) -> FetchOutputs {
        let (outputs, update) = self.evaluate(inputs);
        self.commit(update);
        outputs
    }
}
