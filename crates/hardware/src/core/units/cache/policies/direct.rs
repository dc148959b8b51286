//! Single-way replacement: the only way is always the victim.

use super::ReplacementPolicy;

/// Stateless policy for one-way caches.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectMapped;

impl ReplacementPolicy for DirectMapped {
    fn update(&mut self, _line: usize, _way: usize) {}

    fn victim(&self, _line: usize) -> usize {
        0
    }
}
