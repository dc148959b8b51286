//! Bus slave trait.
//!
//! This module defines the `BusSlave` trait implemented by every responder on
//! the shared memory bus. It provides:
//! 1. **Identification:** `name` for logging.
//! 2. **Response:** `respond` computes this cycle's response from the request
//!    and the slave's current state, without side effects.
//! 3. **Clock Edge:** `clock` applies the effects of the cycle (wait-state
//!    counting, committed writes).
//!
//! Splitting the two lets the interconnect evaluate a cycle more than once
//! before committing it.

use crate::soc::bus::{BusRequest, BusResponse};

/// A responder on the shared memory bus.
pub trait BusSlave: Send {
    /// Short name for this slave (e.g. `"RAM"`).
    fn name(&self) -> &str;

    /// Response to `req` in the current cycle.
    fn respond(&self, req: &BusRequest) -> BusResponse;

    /// Advances the slave past the current cycle, in which `req` was presented.
    fn clock(&mut self, req: &BusRequest);
}
