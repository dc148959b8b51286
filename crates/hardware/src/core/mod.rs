//! Core-side memory units.
//!
//! This module contains the units a 32-bit in-order core uses to reach memory:
//! the instruction fetch unit, the load/store unit and the cache controller
//! they both build on.

/// Memory units (cache controller, fetch unit, load/store unit).
pub mod units;

pub use self::units::cache::Cache;
pub use self::units::ifu::FetchUnit;
pub use self::units::lsu::LoadStoreUnit;
