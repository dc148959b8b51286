//! System Interconnect.
//!
//! This module joins the two bus masters of the core to the shared memory bus. It provides:
//! 1. **Arbitration:** The data port has priority over the instruction port;
//!    a granted master keeps the bus until it drops `cyc`.
//! 2. **Routing:** The slave sees the owner's request; only the owner sees the response.
//! 3. **Snooping:** Both caches observe the shared bus. Each master also sees
//!    its own port, which lets its cache recognize its own writes.
//! 4. **Statistics:** Transfers, errors and busy cycles on the bus.

use std::fmt;

use crate::common::ConfigError;
use crate::config::{CacheConfig, Config};
use crate::core::units::ifu::{FetchInputs, FetchOutputs, FetchUnit, FetchUpdate};
use crate::core::units::lsu::{LoadStoreUnit, LsuInputs, LsuOutputs, LsuUpdate};
use crate::soc::arbiter::{Arbiter, Grant, PortId};
use crate::soc::bus::{BusRequest, BusResponse, SnoopPort};
use crate::soc::memory::Memory;
use crate::soc::traits::BusSlave;
use crate::stats::BusStats;

/// Arbitration priority of the data port.
pub const DATA_PORT_PRIORITY: u32 = 0;
/// Arbitration priority of the instruction port.
pub const INSTRUCTION_PORT_PRIORITY: u32 = 1;

/// Outputs of the whole memory system for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemOutputs {
    /// Fetch unit outputs.
    pub fetch: FetchOutputs,
    /// Load/store unit outputs.
    pub lsu: LsuOutputs,
    /// Request on the shared bus.
    pub bus: BusRequest,
    /// Slave response on the shared bus.
    pub response: BusResponse,
}

/// State changes produced by [`MemorySystem::evaluate`].
#[derive(Debug)]
pub struct SystemUpdate {
    fetch: FetchUpdate,
    lsu: LsuUpdate,
    grant: Grant,
    bus: BusRequest,
    response: BusResponse,
}

/// Fetch unit, load/store unit, system arbiter and bus slave.
pub struct MemorySystem<S: BusSlave = Memory> {
    fetch: FetchUnit,
    lsu: LoadStoreUnit,
    arbiter: Arbiter,
    dport_id: PortId,
    iport_id: PortId,
    slave: S,
    stats: BusStats,
}

impl MemorySystem<Memory> {
    /// Builds the system described by `config`, with RAM as the slave.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated or unvalidated configuration; it is validated here.
    ///
    /// # Returns
    ///
    /// The system, or the first configuration error found.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::with_slave(&config.icache, &config.dcache, Memory::new(&config.memory)?)
    }

    /// Main memory.
    pub const fn memory(&self) -> &Memory {
        &self.slave
    }

    /// Main memory, for preloading.
    pub const fn memory_mut(&mut self) -> &mut Memory {
        &mut self.slave
    }
}

impl<S: BusSlave> MemorySystem<S> {
    /// Builds a system around an arbitrary bus slave.
    pub fn with_slave(icache: &CacheConfig, dcache: &CacheConfig, slave: S) -> Result<Self, ConfigError> {
        let mut arbiter = Arbiter::new();
        let dport_id = arbiter.add_port(DATA_PORT_PRIORITY)?;
        let iport_id = arbiter.add_port(INSTRUCTION_PORT_PRIORITY)?;
        Ok(Self {
            fetch: FetchUnit::new(icache)?,
            lsu: LoadStoreUnit::new(dcache)?,
            arbiter,
            dport_id,
            iport_id,
            slave,
            stats: BusStats::default(),
        })
    }

    /// Fetch unit.
    pub const fn fetch(&self) -> &FetchUnit {
        &self.fetch
    }

    /// Load/store unit.
    pub const fn lsu(&self) -> &LoadStoreUnit {
        &self.lsu
    }

    /// System arbiter.
    pub const fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Bus slave.
    pub const fn slave(&self) -> &S {
        &self.slave
    }

    /// Bus counters.
    pub const fn stats(&self) -> &BusStats {
        &self.stats
    }

    fn requests(&self) -> [BusRequest; 2] {
        let mut reqs = [BusRequest::IDLE; 2];
        reqs[self.dport_id.index()] = self.lsu.bus_request();
        reqs[self.iport_id.index()] = self.fetch.bus_request();
        reqs
    }

    /// Evaluates one cycle without changing state.
    ///
    /// The `dport`, `iport` and `snoop` fields of the inputs are ignored; they
    /// are driven from the shared bus.
    ///
    /// # Arguments
    ///
    /// * `fetch` - Fetch-side pipeline inputs.
    /// * `lsu` - Data-side pipeline inputs.
    ///
    /// # Returns
    ///
    /// This cycle's outputs and the state to commit.
    pub fn evaluate(&self, fetch: &FetchInputs, lsu: &LsuInputs) -> (SystemOutputs, SystemUpdate) {
        let requests = self.requests();
        let bus = self.arbiter.bus_request(&requests);
        let response = self.slave.respond(&bus);
        let snoop = SnoopPort::observe(&bus, &response);

        let (lsu_out, lsu_update) = self.lsu.evaluate(&LsuInputs {
            dport: self.arbiter.response_for(self.dport_id, response),
            snoop,
            ..*lsu
        });
        let (fetch_out, fetch_update) = self.fetch.evaluate(&FetchInputs {
            iport: self.arbiter.response_for(self.iport_id, response),
            snoop,
            ..*fetch
        });

        let outputs = SystemOutputs { fetch: fetch_out, lsu: lsu_out, bus, response };
        let update = SystemUpdate {
            fetch: fetch_update,
            lsu: lsu_update,
            grant: self.arbiter.next_grant(&requests),
            bus,
            response,
        };
        (outputs, update)
    }

    /// Applies `update` at the clock edge.
    pub fn commit(&mut self, update: SystemUpdate) {
        let SystemUpdate { fetch, lsu, grant, bus, response } = update;

        if bus.cyc {
            self.stats.busy_cycles += 1;
        }
        if response.ack {
            self.stats.acks += 1;
            match self.arbiter.owner() {
                Some(p) if p == self.dport_id => self.stats.data_port_transfers += 1,
                Some(p) if p == self.iport_id => self.stats.instruction_port_transfers += 1,
                _ => {}
            }
        }
        if response.err {
            self.stats.errors += 1;
        }

        self.slave.clock(&bus);
        self.lsu.commit(lsu);
        self.fetch.commit(fetch);
        self.arbiter.commit(grant);
    }

    /// Evaluates and commits one cycle.
    pub fn tick(&mut self, fetch: &FetchInputs, lsu: &LsuInputs) -> SystemOutputs {
        let (outputs, update) = self.evaluate(fetch, lsu);
        self.commit(update);
        outputs
    }
}

impl<S: BusSlave> fmt::Debug for MemorySystem<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySystem")
            .field("fetch", &self.fetch)
            .field("lsu", &self.lsu)
            .field("arbiter", &self.arbiter)
            .field("slave", &self.slave.name())
            .field("stats", &self.stats)
            .finish()
    }
}
