//! Cache Replacement Policies.
//!
//! Selects the way a refill overwrites.
//!
//! # Policies
//!
//! - `LruPolicy`: One LRU bit per line for 2-way caches.
//! - `DirectMapped`: Single-way caches; always way 0 and stateless.

/// Single-way (constant victim) policy.
pub mod direct;

/// Two-way least recently used policy.
pub mod lru;

pub use direct::DirectMapped;
pub use lru::LruPolicy;

use std::fmt::Debug;

/// Trait for cache replacement policies.
///
/// `victim` is read during combinational evaluation, so it takes `&self`;
/// state changes are applied through `update` at the clock edge.
pub trait ReplacementPolicy: Debug + Send + Sync {
    /// Records that `way` of `line` was used (hit or filled).
    ///
    /// # Arguments
    ///
    /// * `line` - The line index.
    /// * `way` - The way that was used.
    fn update(&mut self, line: usize, way: usize);

    /// Way the next refill of `line` overwrites.
    fn victim(&self, line: usize) -> usize;
}

/// Builds the policy for a cache with `nways` ways and `nlines` lines.
pub fn for_ways(nways: usize, nlines: usize) -> Box<dyn ReplacementPolicy> {
    if nways > 1 { Box::new(LruPolicy::new(nlines)) } else { Box::new(DirectMapped) }
}
