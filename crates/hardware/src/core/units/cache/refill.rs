//! Cache Control State Machines.
//!
//! Two small FSMs sequence the cache:
//! 1. **Refill:** READ → REFILL → RECOVER → READ. Owns the outstanding bus
//!    request for a line fill and decides when it ends.
//! 2. **Read Port:** IDLE / REFILL / KILLED. Chooses the registered array read
//!    line so the array output lines up with the access phase after stalls,
//!    refills and kills.
//!
//! Both are pure transition functions over explicit enums; the controller
//! latches the returned state at the clock edge.

use crate::common::first_match;

/// Refill FSM state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RefillState {
    /// Idle; looking for a miss.
    #[default]
    Read,
    /// Bus request outstanding for the staged line.
    Refill,
    /// One cycle after a refill ended; no miss is reported.
    Recover,
}

/// How a refill ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefillEnd {
    /// Final beat acknowledged; the line is valid.
    Completed,
    /// The bus answered with an error.
    BusError,
    /// A global flush arrived.
    Flushed,
    /// The pipeline killed the access.
    Killed,
    /// A peer wrote the line being filled.
    Snooped,
}

/// Inputs sampled by the refill FSM in one cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct RefillInputs {
    /// A valid, read-enabled, non-killed access missed.
    pub miss: bool,
    /// Beat acknowledged.
    pub ack: bool,
    /// Bus error.
    pub err: bool,
    /// The current beat is the last of the line.
    pub last: bool,
    /// Global flush.
    pub flush: bool,
    /// Pipeline kill.
    pub kill: bool,
    /// Peer write to the staged line.
    pub snooped: bool,
}

/// Result of one refill FSM transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefillStep {
    /// State after the clock edge.
    pub next: RefillState,
    /// Stage the missing line and raise the bus request.
    pub start: bool,
    /// Advance the bus offset to the next beat.
    pub advance: bool,
    /// The refill terminates this cycle.
    pub end: Option<RefillEnd>,
}

impl RefillState {
    /// Returns true while the line-fill bus request is outstanding.
    #[inline]
    pub const fn bus_valid(self) -> bool {
        matches!(self, Self::Refill)
    }

    /// Miss output seen by the pipeline for a raw lookup result `miss`.
    pub const fn reported_miss(self, miss: bool) -> bool {
        match self {
            Self::Read => miss,
            Self::Refill => true,
            Self::Recover => false,
        }
    }

    /// Transition for one cycle.
    ///
    /// # Arguments
    ///
    /// * `i` - This cycle's sampled inputs.
    ///
    /// # Returns
    ///
    /// The next state and the register actions to take at the edge. A snooped
    /// abort goes straight back to `Read` so the stalled access misses again
    /// and refetches; every other ending passes through `Recover`.
    pub fn step(self, i: &RefillInputs) -> RefillStep {
        match self {
            Self::Read => RefillStep {
                next: if i.miss { Self::Refill } else { Self::Read },
                start: i.miss,
                advance: false,
                end: None,
            },
            Self::Refill => {
                let end = first_match(
                    &[
                        (i.ack && i.last, Some(RefillEnd::Completed)),
                        (i.err, Some(RefillEnd::BusError)),
                        (i.flush, Some(RefillEnd::Flushed)),
                        (i.kill, Some(RefillEnd::Killed)),
                        (i.snooped, Some(RefillEnd::Snooped)),
                    ],
                    None,
                );
                let next = match end {
                    None => Self::Refill,
                    Some(RefillEnd::Snooped) => Self::Read,
                    Some(_) => Self::Recover,
                };
                RefillStep { next, start: false, advance: i.ack, end }
            }
            Self::Recover => RefillStep { next: Self::Read, start: false, advance: false, end: None },
        }
    }
}

/// Array read-address FSM state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadPortState {
    /// Follow the pipeline.
    #[default]
    Idle,
    /// Hold the missing line while the refill runs.
    Refill,
    /// Resynchronize after a kill.
    Killed,
}

/// Inputs sampled by the read-port FSM in one cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadPortInputs {
    /// Address-phase line.
    pub s1_line: u32,
    /// Access-phase line.
    pub s2_line: u32,
    /// Access phase stalled.
    pub s2_stall: bool,
    /// Access killed.
    pub kill: bool,
    /// A refill starts this cycle.
    pub start: bool,
    /// A refill request is outstanding.
    pub bus_valid: bool,
}

impl ReadPortState {
    /// Transition for one cycle, returning the next state and the line to read.
    pub fn step(self, i: &ReadPortInputs) -> (Self, u32) {
        match self {
            Self::Idle => {
                let line = if i.s2_stall { i.s2_line } else { i.s1_line };
                first_match(
                    &[(i.kill, (Self::Killed, line)), (i.start, (Self::Refill, i.s2_line))],
                    (Self::Idle, line),
                )
            }
            Self::Refill => first_match(
                &[(i.kill, (Self::Idle, i.s2_line)), (!i.bus_valid, (Self::Idle, i.s1_line))],
                (Self::Refill, i.s2_line),
            ),
            Self::Killed => (Self::Idle, i.s1_line),
        }
    }
}
