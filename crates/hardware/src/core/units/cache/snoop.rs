//! Snoop-based coherency.
//!
//! A second tag-read port per way watches writes committed on the shared bus.
//! A committed write (`we & valid & ack`) inside the cacheable range that
//! matches a valid line invalidates that line at the next edge, unless the
//! private self-snoop port shows the same address being written by this
//! cache's own master in the same cycle.

use crate::common::AddressLayout;
use crate::core::units::cache::way::Way;
use crate::soc::bus::SnoopPort;

/// Upper bound on associativity.
pub const MAX_WAYS: usize = 2;

/// Snoop decision for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnoopResult {
    /// Line index of the snooped address.
    pub line: u32,
    /// Ways holding a valid copy of the written line.
    pub hits: [bool; MAX_WAYS],
    /// The write is this cache's own.
    pub suppressed: bool,
    /// The write targets the line being refilled.
    pub cancels_refill: bool,
}

impl SnoopResult {
    /// Returns true if `way` must drop the snooped line.
    #[inline]
    pub const fn invalidates(&self, way: usize) -> bool {
        way < MAX_WAYS && self.hits[way] && !self.suppressed
    }
}

/// Evaluates the snoop ports against the tag arrays.
///
/// # Arguments
///
/// * `layout` - Address layout of the cache.
/// * `ways` - Tag and valid arrays.
/// * `snoop` - Shared-bus traffic.
/// * `own` - This cache's own bus port.
/// * `staged` - `(line, tag)` of the refill in flight, if any.
pub fn evaluate(layout: &AddressLayout, ways: &[Way], snoop: &SnoopPort, own: &SnoopPort, staged: Option<(u32, u32)>) -> SnoopResult {
    let peer = layout.decompose(snoop.addr);
    let active = snoop.is_committed_write() && layout.is_cacheable(snoop.addr);
    if !active {
        return SnoopResult { line: peer.line(), ..SnoopResult::default() };
    }

    let suppressed = own.addr == snoop.addr && own.is_committed_write();
    let mut hits = [false; MAX_WAYS];
    for (hit, way) in hits.iter_mut().zip(ways) {
        *hit = way.is_valid(peer.line()) && way.tag(peer.line()) == peer.tag();
    }
    let cancels_refill = !suppressed && staged == Some((peer.line(), peer.tag()));

    SnoopResult { line: peer.line(), hits, suppressed, cancels_refill }
}
