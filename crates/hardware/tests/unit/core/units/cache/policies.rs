//! Replacement Policy Tests.
//!
//! Victim selection for the 2-way LRU bit and the direct-mapped policy, both
//! on the bare policies and through refills of a real cache.

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvmem_core::core::units::cache::policies::{DirectMapped, LruPolicy, ReplacementPolicy, for_ways};

use crate::common::harness::{CacheRig, RAM_BASE, scenario_cache};

/// Four addresses mapping to line 0 with tags 0 to 3.
const CONFLICTING: [u32; 4] = [RAM_BASE, RAM_BASE + 0x1000, RAM_BASE + 0x2000, RAM_BASE + 0x3000];

// ══════════════════════════════════════════════════════════
// 1. Bare policies
// ══════════════════════════════════════════════════════════

#[test]
fn lru_victim_tracks_last_use_per_line() {
    let mut lru = LruPolicy::new(8);
    lru.update(5, 0);
    lru.update(6, 1);
    assert_eq!(lru.victim(5), 1);
    assert_eq!(lru.victim(6), 0);
    assert_eq!(lru.victim(7), 0);
}

#[test]
fn lru_ignores_out_of_range_line() {
    let mut lru = LruPolicy::new(2);
    lru.update(9, 0);
    assert_eq!(lru.victim(9), 0);
}

#[test]
fn direct_mapped_always_picks_way_zero() {
    let mut dm = DirectMapped;
    dm.update(3, 0);
    assert!((0..16).all(|line| dm.victim(line) == 0));
}

#[rstest]
#[case(1, 0)]
#[case(2, 1)]
fn policy_for_way_count(#[case] nways: usize, #[case] after_using_way_zero: usize) {
    let mut policy = for_ways(nways, 4);
    policy.update(2, 0);
    assert_eq!(policy.victim(2), after_using_way_zero);
}

// ══════════════════════════════════════════════════════════
// 2. Through the cache
// ══════════════════════════════════════════════════════════

/// Four conflicting refills alternate ways 0, 1, 0, 1.
#[test]
fn conflicting_refills_alternate_ways() {
    let mut rig = CacheRig::new(&scenario_cache(true), 0);
    let mut victims = Vec::new();

    for &addr in &CONFLICTING {
        let victim = rig.cache.victim(0);
        victims.push(victim);
        let _ = rig.load(addr);
        assert_eq!(rig.cache.lookup(addr), Some(victim));
    }

    assert_eq!(victims, vec![0, 1, 0, 1]);
    assert_eq!(rig.cache.lookup(CONFLICTING[0]), None);
    assert_eq!(rig.cache.lookup(CONFLICTING[1]), None);
}

/// Hitting the way marked as victim makes the other way the victim.
#[test]
fn hit_on_victim_way_moves_victim() {
    let mut rig = CacheRig::new(&scenario_cache(true), 0);
    let _ = rig.load(CONFLICTING[0]);
    let _ = rig.load(CONFLICTING[1]);
    assert_eq!(rig.cache.victim(0), 0);

    assert_eq!(rig.load(CONFLICTING[0]).1, 0);
    assert_eq!(rig.cache.victim(0), 1);

    let _ = rig.load(CONFLICTING[2]);
    assert_eq!(rig.cache.lookup(CONFLICTING[0]), Some(0));
    assert_eq!(rig.cache.lookup(CONFLICTING[1]), None);
    assert_eq!(rig.cache.lookup(CONFLICTING[2]), Some(1));
}

#[test]
fn hit_on_recent_way_keeps_victim() {
    let mut rig = CacheRig::new(&scenario_cache(true), 0);
    let _ = rig.load(CONFLICTING[0]);
    let _ = rig.load(CONFLICTING[1]);

    assert_eq!(rig.load(CONFLICTING[1]).1, 0);

    assert_eq!(rig.cache.victim(0), 0);
}
