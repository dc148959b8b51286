//! Memory access units.
//!
//! This module contains the cache controller and the two bus masters built
//! around it: the instruction fetch unit and the load/store unit.

/// Set-associative cache controller with refill, snooping and replacement.
pub mod cache;

/// Instruction Fetch Unit with read-only cache and bypass port.
pub mod ifu;

/// Load/Store Unit with data cache, store buffer and bypass port.
pub mod lsu;
