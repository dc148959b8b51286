//! Trace-driven simulation.
//!
//! Provides the trace format and the simulator that replays a trace through
//! the memory system cycle by cycle.

/// Cycle-level trace replay.
pub mod simulator;

/// Trace operations, results and loading.
pub mod trace;

pub use self::simulator::{SimReport, Simulator};
pub use self::trace::{FaultRecord, Trace, TraceOp, TraceOutcome, TraceResult};
