//! Memory unit tests.

/// Cache controller tests (lookup, refill, replacement, snooping).
pub mod cache;


/// Load/store unit tests (store buffer, bypass, errors).
pub mod lsu;
