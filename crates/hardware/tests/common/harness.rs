//! Test rigs.
//!
//! The rigs wire one clocked component straight to a RAM slave, without
//! arbitration, so tests can count cycles and bus beats exactly.

use rvmem_core::common::ByteSel;
use rvmem_core::config::{CacheConfig, Config, ErrorWindow, MemoryConfig};
use rvmem_core::core::units::cache::{Cache, CacheInputs, CacheOutputs};
use rvmem_core::core::units::lsu::{LoadStoreUnit, LsuInputs, LsuOutputs};
use rvmem_core::sim::{SimReport, Simulator, Trace, TraceOp};
use rvmem_core::soc::bus::{BusRequest, SnoopPort};
use rvmem_core::soc::memory::Memory;
use rvmem_core::soc::traits::BusSlave;
use tracing_subscriber::EnvFilter;

/// Base of the test RAM and of the cacheable range.
pub const RAM_BASE: u32 = 0x8000_0000;

/// Size of the test RAM.
pub const RAM_SIZE: usize = 64 * 1024;

/// Installs a test-writer subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// 2-way, 128-line, 8-word cache over `[0x8000_0000, 0xFFFF_FFFF)`.
pub fn scenario_cache(enable_write: bool) -> CacheConfig {
    CacheConfig {
        nlines: 128,
        nwords: 8,
        nways: 2,
        start_addr: 0x8000_0000,
        end_addr: 0xFFFF_FFFF,
        enable_write,
    }
}

/// Test RAM with the given wait states and error windows.
pub fn ram_config(latency: u32, error_windows: Vec<ErrorWindow>) -> MemoryConfig {
    MemoryConfig { base: RAM_BASE, size_bytes: RAM_SIZE, latency, error_windows }
}

/// Whole-system configuration over the test RAM.
pub fn system_config(latency: u32) -> Config {
    Config {
        icache: scenario_cache(false),
        dcache: scenario_cache(true),
        memory: ram_config(latency, Vec::new()),
        ..Config::default()
    }
}

/// RAM whose word at `addr` holds `addr ^ 0x5A5A_0000`.
pub fn patterned_ram(latency: u32) -> Memory {
    let mut mem = Memory::new(&ram_config(latency, Vec::new())).unwrap();
    for addr in (RAM_BASE..RAM_BASE + RAM_SIZE as u32).step_by(4) {
        let _ = mem.poke(addr, pattern(addr));
    }
    mem
}

/// Contents of [`patterned_ram`] at `addr`.
pub const fn pattern(addr: u32) -> u32 {
    (addr & !0b11) ^ 0x5A5A_0000
}

/// A cache connected directly to a RAM.
pub struct CacheRig {
    /// Cache under test.
    pub cache: Cache,
    /// Backing memory.
    pub mem: Memory,
    /// Every acknowledged refill beat, in order.
    pub beats: Vec<BusRequest>,
}

impl CacheRig {
    /// Builds a rig over [`patterned_ram`].
    pub fn new(config: &CacheConfig, latency: u32) -> Self {
        init_tracing();
        Self { cache: Cache::new(config).unwrap(), mem: patterned_ram(latency), beats: Vec::new() }
    }

    /// Clocks one cycle; the refill port is served by the RAM.
    pub fn cycle(&mut self, inputs: CacheInputs) -> CacheOutputs {
        let req = self.cache.bus_request();
        let bus = self.mem.respond(&req);
        if bus.ack {
            self.beats.push(req);
        }
        let out = self.cache.tick(&CacheInputs { bus, ..inputs });
        self.mem.clock(&req);
        out
    }

    /// Busy output of the access phase for `inputs`, without clocking.
    pub fn would_miss(&self, inputs: CacheInputs) -> bool {
        let bus = self.mem.respond(&self.cache.bus_request());
        self.cache.evaluate(&CacheInputs { bus, ..inputs }).0.s2_miss
    }

    /// Presents `addr` in the address phase for one cycle.
    pub fn address_phase(&mut self, addr: u32) {
        let _ = self.cycle(CacheInputs { s1_addr: addr, s1_valid: true, s1_access: true, ..CacheInputs::default() });
    }

    /// Runs a word load through both phases.
    ///
    /// Returns the loaded word and the number of cycles the access phase was busy.
    pub fn load(&mut self, addr: u32) -> (u32, u32) {
        self.load_with(addr, |_, i| i)
    }

    /// Like [`CacheRig::load`], letting `edit` change the access-phase inputs of
    /// each cycle (given the number of beats acknowledged so far).
    pub fn load_with(&mut self, addr: u32, mut edit: impl FnMut(usize, CacheInputs) -> CacheInputs) -> (u32, u32) {
        self.address_phase(addr);
        let mut busy = 0;
        loop {
            let base = CacheInputs {
                s2_addr: addr,
                s2_valid: true,
                s2_access: true,
                s2_re: true,
                ..CacheInputs::default()
            };
            let inputs = edit(self.beats.len(), base);
            let stall = self.would_miss(inputs);
            let out = self.cycle(CacheInputs { s2_stall: stall, ..inputs });
            if !out.s2_miss {
                return (out.s2_rdata, busy);
            }
            busy += 1;
            assert!(busy < 1_000, "load of {addr:#010x} never completed");
        }
    }

    /// Runs a store through both phases. Stores never wait.
    pub fn store(&mut self, addr: u32, data: u32, sel: ByteSel) -> CacheOutputs {
        self.address_phase(addr);
        self.cycle(CacheInputs {
            s2_addr: addr,
            s2_valid: true,
            s2_access: true,
            s2_we: true,
            s2_wdata: data,
            s2_sel: sel,
            ..CacheInputs::default()
        })
    }

    /// Clocks one idle cycle with the given snoop bundles.
    pub fn snoop(&mut self, snoop: SnoopPort, own: SnoopPort) {
        let _ = self.cycle(CacheInputs { snoop, self_snoop: own, ..CacheInputs::default() });
    }
}

/// Snoop bundle of a write committed to `addr`.
pub fn committed_write(addr: u32) -> SnoopPort {
    SnoopPort { addr, we: true, valid: true, ack: true }
}

/// A load/store unit connected directly to a RAM.
pub struct LsuRig {
    /// Unit under test.
    pub lsu: LoadStoreUnit,
    /// Backing memory.
    pub mem: Memory,
    /// Every acknowledged write, in order.
    pub writes: Vec<BusRequest>,
}

impl LsuRig {
    /// Builds a rig over `mem`.
    pub fn new(config: &CacheConfig, mem: Memory) -> Self {
        init_tracing();
        Self { lsu: LoadStoreUnit::new(config).unwrap(), mem, writes: Vec::new() }
    }

    /// Clocks one cycle; the data port is served by the RAM and snooped back.
    pub fn cycle(&mut self, inputs: LsuInputs) -> LsuOutputs {
        let req = self.lsu.bus_request();
        let dport = self.mem.respond(&req);
        if dport.ack && req.we {
            self.writes.push(req);
        }
        let out = self.lsu.tick(&LsuInputs { dport, snoop: SnoopPort::observe(&req, &dport), ..inputs });
        self.mem.clock(&req);
        out
    }

    /// Outputs of `inputs` this cycle, without clocking.
    pub fn outputs_for(&self, inputs: LsuInputs) -> LsuOutputs {
        let req = self.lsu.bus_request();
        let dport = self.mem.respond(&req);
        self.lsu.evaluate(&LsuInputs { dport, snoop: SnoopPort::observe(&req, &dport), ..inputs }).0
    }
}

/// Execute-stage inputs of a word store.
pub fn x_store(addr: u32, data: u32) -> LsuInputs {
    LsuInputs {
        x_addr: addr,
        x_data_w: data,
        x_byte_sel: ByteSel::ALL,
        x_store: true,
        x_valid: true,
        ..LsuInputs::default()
    }
}

/// Simulator over [`system_config`] with the RAM preloaded by [`pattern`].
pub fn patterned_simulator(latency: u32) -> Simulator {
    init_tracing();
    let mut sim = Simulator::new(&system_config(latency)).unwrap();
    let mem = sim.system_mut().memory_mut();
    for addr in (RAM_BASE..RAM_BASE + RAM_SIZE as u32).step_by(4) {
        let _ = mem.poke(addr, pattern(addr));
    }
    sim
}

/// Runs `ops` and returns the report.
pub fn run<S: BusSlave>(sim: &mut Simulator<S>, ops: Vec<TraceOp>) -> SimReport {
    sim.run(&Trace::from(ops)).unwrap()
}

/// Word load.
pub const fn load(addr: u32) -> TraceOp {
    TraceOp::Load { addr, width: rvmem_core::core::units::lsu::MemWidth::Word, signed: false }
}

/// Word store.
pub const fn store(addr: u32, data: u32) -> TraceOp {
    TraceOp::Store { addr, data, width: rvmem_core::core::units::lsu::MemWidth::Word }
}

/// Instruction fetch.
pub const fn fetch(addr: u32) -> TraceOp {
    TraceOp::Fetch { addr }
}
