//! Load/Store Unit (LSU).
//!
//! This module provides the cached load/store unit between the execute and
//! memory pipeline stages and the data bus. It includes:
//! - [`format`]: Byte-lane selection, store replication and load extension.
//! - [`store_buffer`]: The FIFO of committed stores waiting for the bus.
//!
//! The unit routes every access by address. Cacheable loads and stores use
//! the data cache; cacheable stores are also queued in the store buffer,
//! which writes them through to memory. Other addresses use a bypass port
//! with a single outstanding request. Three ports share the data bus through
//! a fixed-priority arbiter: store buffer, then cache refill, then bypass.

/// Load/store data formatting.
pub mod format;

/// Store buffer (write-through FIFO).
pub mod store_buffer;

pub use self::format::MemWidth;
pub use self::store_buffer::{StoreBuffer, StoreEntry};

use tracing::{debug, trace};

use crate::common::{ByteSel, ConfigError, Fault, FaultKind, first_match};
use crate::config::CacheConfig;
use crate::core::units::cache::{Cache, CacheInputs, CacheUpdate};
use crate::soc::arbiter::{Arbiter, Grant, PortId};
use crate::soc::bus::{BusRequest, BusResponse, SnoopPort};
use crate::stats::StoreBufferStats;

/// Arbitration priority of the store buffer port.
pub const STORE_BUFFER_PRIORITY: u32 = 0;
/// Arbitration priority of the cache refill port.
pub const REFILL_PRIORITY: u32 = 1;
/// Arbitration priority of the bypass port.
pub const BYPASS_PRIORITY: u32 = 2;

/// Pipeline and bus inputs of one cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct LsuInputs {
    /// Execute-stage address.
    pub x_addr: u32,
    /// Execute-stage store data, replicated to its lanes.
    pub x_data_w: u32,
    /// Execute-stage byte lanes.
    pub x_byte_sel: ByteSel,
    /// Execute stage holds a load.
    pub x_load: bool,
    /// Execute stage holds a store.
    pub x_store: bool,
    /// Execute stage holds a valid instruction.
    pub x_valid: bool,
    /// Execute stage stalled.
    pub x_stall: bool,
    /// Execute stage holds a fence.
    pub x_fence: bool,

    /// Memory-stage address.
    pub m_addr: u32,
    /// Memory stage holds a load.
    pub m_load: bool,
    /// Memory stage holds a store.
    pub m_store: bool,
    /// Memory stage holds a valid instruction.
    pub m_valid: bool,
    /// Memory stage stalled.
    pub m_stall: bool,
    /// Memory stage killed.
    pub m_kill: bool,

    /// Data-bus response.
    pub dport: BusResponse,
    /// Shared-bus traffic for the data cache snoop port.
    pub snoop: SnoopPort,
}

/// Outputs of one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LsuOutputs {
    /// The execute stage must wait.
    pub x_busy: bool,
    /// The memory stage must wait.
    pub m_busy: bool,
    /// Word read by the memory-stage load.
    pub m_load_data: u32,
    /// A load bus error is latched.
    pub m_load_error: bool,
    /// A store bus error is latched.
    pub m_store_error: bool,
    /// Address of the erroring transaction.
    pub m_badaddr: u32,
    /// Data-bus request.
    pub dport: BusRequest,
}

impl LsuOutputs {
    /// The latched bus error, if any.
    pub const fn fault(&self) -> Option<Fault> {
        if self.m_load_error {
            Some(Fault { kind: FaultKind::Load, addr: self.m_badaddr })
        } else if self.m_store_error {
            Some(Fault { kind: FaultKind::Store, addr: self.m_badaddr })
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LsuRegisters {
    m_use_cache: bool,
    m_data_w: u32,
    m_byte_sel: ByteSel,
    sb_port: BusRequest,
    bypass: BusRequest,
    bypass_rdata: u32,
    load_error: bool,
    store_error: bool,
    badaddr: u32,
}

/// State changes produced by [`LoadStoreUnit::evaluate`].
#[derive(Clone, Debug)]
pub struct LsuUpdate {
    regs: LsuRegisters,
    cache: CacheUpdate,
    grant: Grant,
    enqueue: Option<StoreEntry>,
    /// Head entry retired this cycle; `true` if it ended in a bus error.
    dequeue: Option<bool>,
}

/// Cached load/store unit.
#[derive(Debug)]
pub struct LoadStoreUnit {
    dcache: Cache,
    store_buffer: StoreBuffer,
    arbiter: Arbiter,
    sb_id: PortId,
    refill_id: PortId,
    bypass_id: PortId,
    regs: LsuRegisters,
    stats: StoreBufferStats,
}

impl LoadStoreUnit {
    /// Creates the unit around a data cache.
    ///
    /// # Arguments
    ///
    /// * `config` - Data cache geometry. The cache is always write-enabled,
    ///   since in-place store merging keeps it coherent with the store buffer.
    ///
    /// # Returns
    ///
    /// The unit, with a store buffer one line deep.
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        let dcache = Cache::new(&CacheConfig { enable_write: true, ..config.clone() })?.named("dcache");
        let mut arbiter = Arbiter::new();
        let sb_id = arbiter.add_port(STORE_BUFFER_PRIORITY)?;
        let refill_id = arbiter.add_port(REFILL_PRIORITY)?;
        let bypass_id = arbiter.add_port(BYPASS_PRIORITY)?;
        Ok(Self {
            store_buffer: StoreBuffer::new(dcache.layout().nwords()),
            dcache,
            arbiter,
            sb_id,
            refill_id,
            bypass_id,
            regs: LsuRegisters::default(),
            stats: StoreBufferStats::default(),
        })
    }

    /// Data cache.
    pub const fn dcache(&self) -> &Cache {
        &self.dcache
    }

    /// Store buffer.
    pub const fn store_buffer(&self) -> &StoreBuffer {
        &self.store_buffer
    }

    /// Port arbiter.
    pub const fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Store-buffer counters.
    pub const fn stats(&self) -> &StoreBufferStats {
        &self.stats
    }

    fn requests(&self) -> [BusRequest; 3] {
        let mut reqs = [BusRequest::IDLE; 3];
        reqs[self.sb_id.index()] = self.regs.sb_port;
        reqs[self.refill_id.index()] = self.dcache.bus_request();
        reqs[self.bypass_id.index()] = self.regs.bypass;
        reqs
    }

    /// Data-bus request, from registers only.
    pub fn bus_request(&self) -> BusRequest {
        self.arbiter.bus_request(&self.requests())
    }

    /// Next store-buffer port request.
    ///
    /// The port keeps `cyc` asserted while entries remain, dropping `stb` for
    /// one cycle between entries so that each entry is its own transfer.
    fn next_sb_port(&self, resp: &BusResponse) -> (BusRequest, Option<bool>) {
        let port = self.regs.sb_port;
        let head = self.store_buffer.front().map(|e| BusRequest::write(e.addr, e.data, e.sel));

        if !port.cyc {
            return (head.unwrap_or(BusRequest::IDLE), None);
        }
        if resp.completes() {
            let next = if self.store_buffer.len() > 1 { BusRequest { stb: false, ..port } } else { BusRequest::IDLE };
            return (next, Some(resp.err));
        }
        if !port.stb {
            return (head.unwrap_or(BusRequest::IDLE), None);
        }
        (port, None)
    }

    /// Evaluates one cycle without changing state.
    ///
    /// # Arguments
    ///
    /// * `i` - Pipeline inputs, the data-bus response and the snoop bundle.
    ///
    /// # Returns
    ///
    /// This cycle's outputs and the state to commit.
    pub fn evaluate(&self, i: &LsuInputs) -> (LsuOutputs, LsuUpdate) {
        let r = &self.regs;
        let requests = self.requests();
        let dport = self.arbiter.bus_request(&requests);
        let sb_resp = self.arbiter.response_for(self.sb_id, i.dport);
        let refill_resp = self.arbiter.response_for(self.refill_id, i.dport);
        let bypass_resp = self.arbiter.response_for(self.bypass_id, i.dport);

        let x_use_cache = self.dcache.is_cacheable(i.x_addr);
        let x_accepted = i.x_valid && !i.x_stall;

        let (cache_out, cache_update) = self.dcache.evaluate(&CacheInputs {
            s1_addr: i.x_addr,
            s1_valid: i.x_valid && x_use_cache,
            s1_stall: i.x_stall,
            s1_access: i.x_load || i.x_store,
            s1_flush: false,
            s2_addr: i.m_addr,
            s2_valid: i.m_valid && r.m_use_cache,
            s2_stall: i.m_stall,
            s2_kill: i.m_kill,
            s2_access: i.m_load || i.m_store,
            s2_re: i.m_load,
            s2_we: i.m_store,
            s2_wdata: r.m_data_w,
            s2_sel: r.m_byte_sel,
            s2_evict: false,
            bus: refill_resp,
            snoop: i.snoop,
            self_snoop: SnoopPort::observe(&dport, &i.dport),
        });

        let enqueue = (x_use_cache && i.x_store && x_accepted && !self.store_buffer.is_full()).then_some(
            StoreEntry { addr: i.x_addr, data: i.x_data_w, sel: i.x_byte_sel },
        );
        let (sb_port, dequeue) = self.next_sb_port(&sb_resp);

        let (bypass, bypass_rdata) = if r.bypass.cyc {
            if bypass_resp.completes() || !i.m_valid {
                (BusRequest::IDLE, bypass_resp.dat_r)
            } else {
                (r.bypass, r.bypass_rdata)
            }
        } else if (i.x_load || i.x_store) && x_accepted && !x_use_cache {
            let req = if i.x_store {
                BusRequest::write(i.x_addr, i.x_data_w, i.x_byte_sel)
            } else {
                BusRequest { sel: i.x_byte_sel, ..BusRequest::read(i.x_addr) }
            };
            (req, r.bypass_rdata)
        } else {
            (r.bypass, r.bypass_rdata)
        };

        let bus_error = dport.cyc && i.dport.err;
        let (load_error, store_error, badaddr) = first_match(
            &[
                (bus_error, (!dport.we, dport.we, dport.addr)),
                (!i.m_stall, (false, false, r.badaddr)),
            ],
            (r.load_error, r.store_error, r.badaddr),
        );

        let (m_use_cache, m_data_w, m_byte_sel) =
            if i.x_stall { (r.m_use_cache, r.m_data_w, r.m_byte_sel) } else { (x_use_cache, i.x_data_w, i.x_byte_sel) };

        let x_busy = first_match(
            &[
                (i.x_fence, !self.store_buffer.is_empty()),
                (x_use_cache, i.x_store && self.store_buffer.is_full()),
            ],
            r.bypass.cyc,
        );
        let (m_busy, m_load_data) = first_match(
            &[
                (r.m_use_cache, (i.m_load && cache_out.s2_miss, cache_out.s2_rdata)),
                (r.load_error || r.store_error, (false, 0)),
            ],
            (r.bypass.cyc, r.bypass_rdata),
        );

        let outputs = LsuOutputs {
            x_busy,
            m_busy,
            m_load_data,
            m_load_error: r.load_error,
            m_store_error: r.store_error,
            m_badaddr: r.badaddr,
            dport,
        };
        let update = LsuUpdate {
            regs: LsuRegisters {
                m_use_cache,
                m_data_w,
                m_byte_sel,
                sb_port,
                bypass,
                bypass_rdata,
                load_error,
                store_error,
                badaddr,
            },
            cache: cache_update,
            grant: self.arbiter.next_grant(&requests),
            enqueue,
            dequeue,
        };
        (outputs, update)
    }

    /// Applies `update` at the clock edge.
    pub fn commit(&mut self, update: LsuUpdate) {
        let LsuUpdate { regs, cache, grant, enqueue, dequeue } = update;

        self.dcache.commit(cache);
        if let Some(failed) = dequeue
            && let Some(entry) = self.store_buffer.pop()
        {
            self.stats.drained += 1;
            self.stats.drain_errors += u64::from(failed);
            trace!(addr = format_args!("{:#010x}", entry.addr), failed, "store buffer drained");
        }
        if let Some(entry) = enqueue
            && self.store_buffer.push(entry)
        {
            self.stats.enqueued += 1;
            trace!(
                addr = format_args!("{:#010x}", entry.addr),
                depth = self.store_buffer.len(),
                "store buffer enqueued"
            );
        }
        self.arbiter.commit(grant);

        let latched = regs.load_error || regs.store_error;
        if latched && !(self.regs.load_error || self.regs.store_error) {
            debug!(
                addr = format_args!("{:#010x}", regs.badaddr),
                load = regs.load_error,
                "data bus error latched"
            );
        }
        self.regs = regs;
    }

    /// Evaluates and commits one cycle.
    pub fn tick(&mut self, inputs: &LsuInputs) -> LsuOutputs {
        let (outputs, update) = self.evaluate(inputs);
        self.commit(update);
        outputs
    }
}
