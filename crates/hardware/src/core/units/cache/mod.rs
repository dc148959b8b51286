//! Set-Associative Cache Controller.
//!
//! This module implements a 1- or 2-way cache with line refill over the
//! memory bus. It provides:
//! 1. **Two-Phase Lookup:** The address phase selects the array read line; the
//!    access phase compares tags and returns the hit word one cycle later.
//! 2. **Refill:** A wrapping burst that fetches the missed word first and
//!    covers the whole line, sequenced by the refill FSM.
//! 3. **Store Merge:** On a hit, CPU stores overwrite the selected byte lanes
//!    of the hit way's word (write-enabled caches only).
//! 4. **Coherency:** Snooped peer writes invalidate matching lines and abort a
//!    refill of the same line; the cache's own writes are not snooped.
//! 5. **Eviction and Flush:** Per-line invalidation by tag, and global flush.
//!
//! Each cycle is split in two. `evaluate` is a pure function of the current
//! registers, arrays and inputs; it returns the outputs and a `CacheUpdate`
//! describing every register and array write. `commit` applies the update at
//! the clock edge. `tick` does both.

/// Replacement policies (LRU bit per line, direct mapped).
pub mod policies;

/// Refill and array read-address state machines.
pub mod refill;

/// Snoop port evaluation.
pub mod snoop;

/// Tag, valid and data arrays.
pub mod way;

pub use self::refill::{ReadPortState, RefillEnd, RefillState};

use tracing::{debug, trace};

use self::policies::ReplacementPolicy;
use self::refill::{ReadPortInputs, RefillInputs};
use self::way::Way;
use crate::common::{AddressLayout, ByteSel, ConfigError, LineAddress, first_match};
use crate::config::CacheConfig;
use crate::soc::bus::{BurstWrap, BusRequest, BusResponse, CycleType, SnoopPort};
use crate::stats::CacheStats;

/// Inputs sampled by the cache in one cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheInputs {
    /// Address-phase address.
    pub s1_addr: u32,
    /// Address phase holds a valid access.
    pub s1_valid: bool,
    /// Address phase stalled.
    pub s1_stall: bool,
    /// Address phase is a memory access (counted).
    pub s1_access: bool,
    /// Invalidate every line and abort any refill.
    pub s1_flush: bool,

    /// Access-phase address.
    pub s2_addr: u32,
    /// Access phase holds a valid access.
    pub s2_valid: bool,
    /// Access phase stalled; the array must keep reading its line.
    pub s2_stall: bool,
    /// Access phase killed.
    pub s2_kill: bool,
    /// Access phase is a memory access (counted).
    pub s2_access: bool,
    /// Read access; only reads start a refill.
    pub s2_re: bool,
    /// Store access.
    pub s2_we: bool,
    /// Store data.
    pub s2_wdata: u32,
    /// Store byte lanes.
    pub s2_sel: ByteSel,
    /// Invalidate the line matching the access-phase address.
    pub s2_evict: bool,

    /// Response to this cache's refill request.
    pub bus: BusResponse,
    /// Shared-bus traffic.
    pub snoop: SnoopPort,
    /// This cache's own bus port.
    pub self_snoop: SnoopPort,
}

/// Outputs of the cache in one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheOutputs {
    /// The access phase must wait (miss, or refill in progress).
    pub s2_miss: bool,
    /// Hit word.
    pub s2_rdata: u32,
    /// Refill bus request.
    pub bus: BusRequest,
    /// The refill beat on the bus is the last of the line.
    pub bus_last: bool,
}

/// Events of one cycle, folded into [`CacheStats`] at commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheEvents {
    /// A new access entered the address phase.
    pub access: bool,
    /// A valid access missed with no refill outstanding.
    pub miss: bool,
    /// A refill started.
    pub refill_started: bool,
    /// A refill ended.
    pub refill_end: Option<RefillEnd>,
    /// Lines invalidated by the snoop port.
    pub snoop_invalidations: u32,
    /// A committed write was recognized as this cache's own.
    pub self_snoop_suppressed: bool,
    /// A CPU store merged into a hit line.
    pub store_hit: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Registers {
    refill: RefillState,
    read_port: ReadPortState,
    read_line: u32,
    /// Address of the current refill beat.
    bus_addr: LineAddress,
    /// Offset of the final beat.
    fill_cnt: u32,
    staged_line: u32,
    staged_tag: u32,
    victim: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DataWrite {
    way: usize,
    line: u32,
    offset: u32,
    value: u32,
}

/// Register and array writes produced by [`Cache::evaluate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheUpdate {
    regs: Registers,
    tag_write: Option<(usize, u32, u32)>,
    data_write: Option<DataWrite>,
    /// `(way, line, value)`, highest priority first.
    valid_writes: Vec<(usize, u32, bool)>,
    flush: bool,
    lru_touch: Option<(u32, usize)>,
    events: CacheEvents,
}

impl CacheUpdate {
    /// Events recorded this cycle.
    pub const fn events(&self) -> &CacheEvents {
        &self.events
    }

    /// Refill state after the edge.
    pub const fn next_refill_state(&self) -> RefillState {
        self.regs.refill
    }
}

/// Cache controller.
#[derive(Debug)]
pub struct Cache {
    name: &'static str,
    layout: AddressLayout,
    enable_write: bool,
    ways: Vec<Way>,
    policy: Box<dyn ReplacementPolicy>,
    regs: Registers,
    stats: CacheStats,
}

impl Cache {
    /// Creates an empty cache.
    ///
    /// # Arguments
    ///
    /// * `config` - Geometry, cacheable range and write enable.
    ///
    /// # Returns
    ///
    /// The cache with every line invalid, or the geometry error.
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        let layout = config.layout()?;
        Ok(Self {
            name: "cache",
            layout,
            enable_write: config.enable_write,
            ways: (0..config.nways).map(|_| Way::new(layout.nlines(), layout.nwords())).collect(),
            policy: policies::for_ways(config.nways, layout.nlines()),
            regs: Registers::default(),
            stats: CacheStats::default(),
        })
    }

    /// Sets the name used in log events.
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Address layout.
    #[inline]
    pub const fn layout(&self) -> &AddressLayout {
        &self.layout
    }

    /// Number of ways.
    pub fn nways(&self) -> usize {
        self.ways.len()
    }

    /// Way `index`, for inspection.
    pub fn way(&self, index: usize) -> Option<&Way> {
        self.ways.get(index)
    }

    /// Returns true if `addr` is in the cacheable range.
    #[inline]
    pub const fn is_cacheable(&self, addr: u32) -> bool {
        self.layout.is_cacheable(addr)
    }

    /// Refill FSM state.
    pub const fn refill_state(&self) -> RefillState {
        self.regs.refill
    }

    /// Array read-address FSM state.
    pub const fn read_port_state(&self) -> ReadPortState {
        self.regs.read_port
    }

    /// Way the next refill of `line` overwrites.
    pub fn victim(&self, line: u32) -> usize {
        self.policy.victim(line as usize)
    }

    /// Way holding a valid copy of `addr`, if any.
    pub fn lookup(&self, addr: u32) -> Option<usize> {
        let la = self.layout.decompose(addr);
        self.ways.iter().position(|w| w.is_valid(la.line()) && w.tag(la.line()) == la.tag())
    }

    /// Cached word at `addr`, if the line is valid.
    pub fn peek(&self, addr: u32) -> Option<u32> {
        let la = self.layout.decompose(addr);
        self.lookup(addr).map(|w| self.ways[w].word(la.line(), la.offset()))
    }

    /// Performance counters.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    const fn bus_last(&self) -> bool {
        self.regs.refill.bus_valid() && self.regs.fill_cnt == self.regs.bus_addr.offset()
    }

    /// Refill request, from registers only.
    pub const fn bus_request(&self) -> BusRequest {
        if !self.regs.refill.bus_valid() {
            return BusRequest::IDLE;
        }
        BusRequest {
            addr: self.layout.compose(&self.regs.bus_addr),
            sel: ByteSel::ALL,
            cti: if self.bus_last() { CycleType::EndOfBurst } else { CycleType::IncrementingBurst },
            bte: BurstWrap::for_words(self.layout.nwords()),
            ..BusRequest::read(0)
        }
    }

    /// Evaluates one cycle without changing state.
    ///
    /// # Arguments
    ///
    /// * `i` - Pipeline, bus and snoop inputs for this cycle.
    ///
    /// # Returns
    ///
    /// This cycle's outputs and the writes to apply at the clock edge.
    pub fn evaluate(&self, i: &CacheInputs) -> (CacheOutputs, CacheUpdate) {
        let l = &self.layout;
        let r = &self.regs;
        let s1 = l.decompose(i.s1_addr);
        let s2 = l.decompose(i.s2_addr);

        let hit_way = self
            .ways
            .iter()
            .position(|w| w.is_valid(s2.line()) && w.tag(r.read_line) == s2.tag());
        let raw_miss = hit_way.is_none();
        let rdata = hit_way.map_or(0, |w| self.ways[w].word(r.read_line, s2.offset()));
        let s2_miss = r.refill.reported_miss(raw_miss && i.s2_valid);

        let bus_valid = r.refill.bus_valid();
        let bus_last = self.bus_last();
        let beat_done = bus_valid && i.bus.ack;
        let staged = bus_valid.then_some((r.staged_line, r.staged_tag));
        let snoop = snoop::evaluate(l, &self.ways, &i.snoop, &i.self_snoop, staged);

        let step = r.refill.step(&RefillInputs {
            miss: raw_miss && i.s2_valid && i.s2_re && !i.s2_kill,
            ack: i.bus.ack,
            err: i.bus.err,
            last: bus_last,
            flush: i.s1_flush,
            kill: i.s2_kill,
            snooped: snoop.cancels_refill,
        });
        let (read_port, read_line) = r.read_port.step(&ReadPortInputs {
            s1_line: s1.line(),
            s2_line: s2.line(),
            s2_stall: i.s2_stall,
            kill: i.s2_kill,
            start: step.start,
            bus_valid,
        });

        let mut regs = Registers { refill: step.next, read_port, read_line, ..*r };
        if step.start {
            regs.staged_line = s2.line();
            regs.staged_tag = s2.tag();
            regs.bus_addr = s2.with_offset(l, s2.offset());
            regs.fill_cnt = s2.offset().wrapping_sub(1) & (l.nwords() as u32 - 1);
            regs.victim = self.victim(s2.line());
        }
        if step.advance {
            regs.bus_addr = r.bus_addr.with_offset(l, r.bus_addr.offset() + 1);
        }

        let tag_write = (beat_done && bus_last).then_some((r.victim, r.staged_line, r.staged_tag));

        let cpu_write = self.enable_write && i.s2_we && i.s2_valid && !s2_miss;
        let refill_beat = beat_done.then_some(DataWrite {
            way: r.victim,
            line: r.bus_addr.line(),
            offset: r.bus_addr.offset(),
            value: i.bus.dat_r,
        });
        let store_merge = hit_way.map(|way| DataWrite {
            way,
            line: s2.line(),
            offset: s2.offset(),
            value: i.s2_sel.merge(rdata, i.s2_wdata),
        });
        let data_write = first_match(&[(bus_valid, refill_beat), (cpu_write, store_merge)], None);

        let mut valid_writes = Vec::new();
        for (w, way) in self.ways.iter().enumerate() {
            let filling = bus_valid && w == r.victim;
            let evicting = i.s2_evict && i.s2_valid && way.tag(r.read_line) == s2.tag();
            let rules = [
                (snoop.invalidates(w), (snoop.line, false)),
                (filling && snoop.cancels_refill, (r.staged_line, false)),
                (filling, (r.staged_line, beat_done && bus_last)),
                (evicting, (s2.line(), false)),
            ];
            valid_writes.extend(rules.iter().filter(|(hit, _)| *hit).map(|&(_, (line, v))| (w, line, v)));
        }

        let hit_is_victim = hit_way.is_some_and(|w| w == self.victim(s2.line()));
        let lru_touch = if self.ways.len() < 2 {
            None
        } else {
            first_match(
                &[
                    (beat_done && bus_last, Some((r.staged_line, r.victim))),
                    (i.s2_valid && !s2_miss && hit_is_victim, hit_way.map(|w| (s2.line(), w))),
                ],
                None,
            )
        };

        let events = CacheEvents {
            access: i.s1_valid && !i.s1_stall && i.s1_access,
            miss: i.s2_valid && i.s2_access && s2_miss && !bus_valid,
            refill_started: step.start,
            refill_end: step.end,
            snoop_invalidations: (0..self.ways.len()).filter(|&w| snoop.invalidates(w)).count() as u32,
            self_snoop_suppressed: snoop.suppressed,
            store_hit: cpu_write && hit_way.is_some(),
        };

        let outputs = CacheOutputs { s2_miss, s2_rdata: rdata, bus: self.bus_request(), bus_last };
        let update = CacheUpdate {
            regs,
            tag_write,
            data_write,
            valid_writes,
            flush: i.s1_flush,
            lru_touch,
            events,
        };
        (outputs, update)
    }

    /// Applies `update` at the clock edge.
    pub fn commit(&mut self, update: CacheUpdate) {
        let CacheUpdate { regs, tag_write, data_write, valid_writes, flush, lru_touch, events } = update;

        if let Some((way, line, tag)) = tag_write {
            self.ways[way].write_tag(line, tag);
        }
        if let Some(d) = data_write {
            self.ways[d.way].write_word(d.line, d.offset, d.value);
        }
        // Lowest priority first so the highest-priority write to a bit lands last.
        for &(way, line, value) in valid_writes.iter().rev() {
            self.ways[way].write_valid(line, value);
        }
        if flush {
            self.ways.iter_mut().for_each(Way::invalidate_all);
        }
        if let Some((line, way)) = lru_touch {
            self.policy.update(line as usize, way);
        }

        self.record(&events, &regs);
        self.regs = regs;
    }

    /// Evaluates and commits one cycle.
    pub fn tick(&mut self, inputs: &CacheInputs) -> CacheOutputs {
        let (outputs, update) = self.evaluate(inputs);
        self.commit(update);
        outputs
    }

    fn record(&mut self, e: &CacheEvents, next: &Registers) {
        let s = &mut self.stats;
        s.accesses += u64::from(e.access);
        s.misses += u64::from(e.miss);
        s.store_hits += u64::from(e.store_hit);
        s.snoop_invalidations += u64::from(e.snoop_invalidations);
        s.self_snoops_suppressed += u64::from(e.self_snoop_suppressed);

        if e.refill_started {
            s.refills_started += 1;
            debug!(
                cache = self.name,
                line = next.staged_line,
                tag = next.staged_tag,
                victim = next.victim,
                "refill started"
            );
        }
        match e.refill_end {
            None => {}
            Some(RefillEnd::Completed) => {
                s.refills_completed += 1;
                trace!(cache = self.name, line = self.regs.staged_line, "refill completed");
            }
            Some(RefillEnd::BusError) => {
                s.refill_errors += 1;
                debug!(cache = self.name, line = self.regs.staged_line, "refill bus error");
            }
            Some(end) => {
                s.refills_aborted += 1;
                debug!(cache = self.name, line = self.regs.staged_line, ?end, "refill aborted");
            }
        }
        if e.snoop_invalidations > 0 {
            debug!(cache = self.name, count = e.snoop_invalidations, "snoop invalidation");
        }
    }
}
