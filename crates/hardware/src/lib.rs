//! 32-bit RISC memory hierarchy simulator library.
//!
//! This crate implements a cycle-level model of the memory side of an in-order core:
//! 1. **Caches:** 1- or 2-way set-associative controllers with wrapping burst
//!    refill, LRU replacement, store merge, eviction and flush.
//! 2. **Coherency:** Snooping of shared-bus writes, with the cache's own writes
//!    recognized and ignored.
//! 3. **Units:** A load/store unit with a write-through store buffer and a
//!    fetch unit, each with a bypass port for non-cacheable addresses.
//! 4. **SoC:** Bus signals, fixed-priority arbitration and a RAM slave with
//!    wait states and error windows.
//! 5. **Simulation:** Configuration, trace replay and statistics.
//!
//! Every clocked component follows the same shape: `evaluate` computes this
//! cycle's outputs and the next state without side effects, `commit` applies
//! the next state, and `tick` does both.

/// Common types (address layout, byte lanes, errors, priority selection).
pub mod common;
/// Simulator configuration (defaults, cache geometry, memory model).
pub mod config;
/// Core-side memory units (caches, fetch unit, load/store unit).
pub mod core;
/// Trace format and trace-driven simulator.
pub mod sim;
/// System-on-chip (bus, arbiter, memory, interconnect, traits).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Trace simulator; construct with `Simulator::new`.
pub use crate::sim::Simulator;
/// Fetch unit, load/store unit, arbiter and RAM; construct with `MemorySystem::new`.
pub use crate::soc::MemorySystem;
