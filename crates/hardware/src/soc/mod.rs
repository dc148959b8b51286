//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components on the shared memory bus: the bus
//! signals, the fixed-priority arbiter, the RAM slave, and the interconnect
//! that joins the core's two bus masters to the slave.

/// Fixed-priority bus arbiter.
pub mod arbiter;

/// Bus request, response and snoop signal bundles.
pub mod bus;

/// System interconnect (fetch unit, load/store unit, arbiter, slave).
pub mod interconnect;

/// Main memory model.
pub mod memory;

/// Bus slave trait.
pub mod traits;

pub use self::interconnect::MemorySystem;
