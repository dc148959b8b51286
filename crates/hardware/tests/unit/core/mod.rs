//! Core-side memory unit tests.

/// Cache controller, fetch unit and load/store unit tests.
pub mod units;
