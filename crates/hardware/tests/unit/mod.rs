//! # Unit Components
//!
//! This module mirrors the source tree: common types, configuration, the
//! core-side memory units, the SoC bus components and the trace simulator.



/// Unit tests for the cache controller, fetch unit and load/store unit.
pub mod core;

/// Unit tests for the simulator and its trace format.
pub mod sim;
