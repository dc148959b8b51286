//! Cache controller tests.


/// LRU victim selection.
pub mod policies;

/// Snoop invalidation, suppression and refill cancellation.
pub mod snoop;
