//! Memory Access Traces.
//!
//! This module defines the input and output records of the trace simulator. It provides:
//! 1. **Operations:** Loads, stores, instruction fetches, fences, instruction
//!    cache flushes and idle gaps, read from JSON.
//! 2. **Loading:** Parsing from a string or a file.
//! 3. **Results:** The outcome of every completed operation and the cycle it completed in.
//!
//! A trace file is a JSON array:
//!
//! ```json
//! [
//!   { "op": "store", "addr": 2147483648, "data": 3735928559, "width": "byte" },
//!   { "op": "load", "addr": 2147483648, "width": "word" },
//!   { "op": "fetch", "addr": 2147483652 },
//!   { "op": "idle", "cycles": 10 }
//! ]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{Fault, SimError};
use crate::core::units::lsu::MemWidth;

/// One operation of a trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceOp {
    /// Data read.
    Load {
        /// Byte address.
        addr: u32,
        /// Access width.
        #[serde(default)]
        width: MemWidth,
        /// Sign-extend the loaded value.
        #[serde(default)]
        signed: bool,
    },
    /// Data write.
    Store {
        /// Byte address.
        addr: u32,
        /// Value; only the low `width` bits are stored.
        data: u32,
        /// Access width.
        #[serde(default)]
        width: MemWidth,
    },
    /// Instruction fetch.
    Fetch {
        /// Program counter.
        addr: u32,
    },
    /// Waits until every buffered store has been written to memory.
    Fence,
    /// Waits like [`TraceOp::Fence`], then invalidates the instruction cache.
    #[serde(rename = "flush_icache")]
    FlushICache,
    /// Lets the system run without new operations.
    Idle {
        /// Cycles to wait.
        cycles: u32,
    },
}

impl TraceOp {
    /// Returns true for operations handled by the load/store unit.
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Store { .. } | Self::Fence | Self::FlushICache)
    }
}

/// An ordered list of operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    /// Operations in program order.
    pub ops: Vec<TraceOp>,
}

impl Trace {
    /// Parses a trace from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a trace file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a JSON trace.
    ///
    /// # Returns
    ///
    /// The trace, or `SimError::Io` / `SimError::Trace`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| SimError::Io { path: path.display().to_string(), source })?;
        Self::from_json(&text)
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the trace has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<TraceOp>> for Trace {
    fn from(ops: Vec<TraceOp>) -> Self {
        Self { ops }
    }
}

/// How an operation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// Load or fetch result, already extended to 32 bits.
    Value {
        /// The value.
        value: u32,
    },
    /// Store, fence, flush or idle completed.
    Done,
    /// The access ended in a bus error.
    Fault {
        /// The latched error.
        fault: Fault,
    },
    /// Not naturally aligned; never issued to the memory system.
    Misaligned,
}

/// Result record of one operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TraceResult {
    /// Position in the trace.
    pub index: usize,
    /// The operation.
    pub op: TraceOp,
    /// Cycle in which the operation completed.
    pub cycle: u64,
    /// Outcome.
    pub outcome: TraceOutcome,
}

/// A bus error latched by a unit, whether or not an operation reported it.
///
/// Store-buffer writes complete after their store has left the pipeline, so
/// their errors are imprecise and only appear here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    /// Cycle in which the error became visible.
    pub cycle: u64,
    /// The error.
    pub fault: Fault,
}
