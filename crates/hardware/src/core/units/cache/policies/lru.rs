//! Two-Way Least Recently Used Replacement.
//!
//! One bit per line names the next victim (0 ⇒ way 0). Using a way points the
//! bit at the other way, which is exact LRU for two ways.
//!
//! # Performance
//!
//! - **Time Complexity:** `update()` and `victim()` are O(1)
//! - **Space Complexity:** one bit per line
//! - **Hardware Cost:** a single flip-flop per line

use super::ReplacementPolicy;

/// LRU bit vector.
#[derive(Clone, Debug)]
pub struct LruPolicy {
    bits: Vec<bool>,
}

impl LruPolicy {
    /// Creates the policy with every line pointing at way 0.
    ///
    /// # Arguments
    ///
    /// * `nlines` - Lines per way.
    pub fn new(nlines: usize) -> Self {
        Self { bits: vec![false; nlines] }
    }
}

impl ReplacementPolicy for LruPolicy {
    fn update(&mut self, line: usize, way: usize) {
        if let Some(bit) = self.bits.get_mut(line) {
            *bit = way == 0;
        }
    }

    fn victim(&self, line: usize) -> usize {
        usize::from(self.bits.get(line).copied().unwrap_or(false))
    }
}
