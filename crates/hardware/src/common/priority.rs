//! First-match selection.
//!
//! Hardware priority chains (`if a {..} else if b {..} else {..}`) are written
//! as ordered `(predicate, value)` lists so each chain reads as a table.

/// Returns the value of the first pair whose predicate holds, or `default`.
///
/// # Arguments
///
/// * `rules` - Pairs in priority order, highest first.
/// * `default` - Value when no predicate holds.
#[inline]
pub fn first_match<T: Copy>(rules: &[(bool, T)], default: T) -> T {
    rules.iter().find(|(hit, _)| *hit).map_or(default, |&(_, value)| value)
}
