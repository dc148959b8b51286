//! Error Types and Bus Faults.
//!
//! Two kinds of failure exist in the model:
//! 1. **Construction Errors:** Invalid geometry, configuration or wiring,
//!    reported as Rust errors when a component is built.
//! 2. **Bus Faults:** Error responses seen at run time. Hardware latches these
//!    as level signals; [`Fault`] is the record the simulator keeps of them.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Invalid cache geometry, memory model or configuration source.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Line count is zero or not a power of two.
    #[error("line count must be a non-zero power of two, got {0}")]
    LineCount(usize),

    /// Words per line is not 4, 8 or 16.
    #[error("words per line must be 4, 8 or 16, got {0}")]
    WordsPerLine(usize),

    /// Associativity is not 1 or 2.
    #[error("way count must be 1 or 2, got {0}")]
    Ways(usize),

    /// Cacheable range is empty or extends past the 32-bit address space.
    #[error("cacheable range [{start:#x}, {end:#x}) is empty or exceeds 2^32")]
    Range {
        /// Range start.
        start: u64,
        /// Range end (exclusive).
        end: u64,
    },

    /// Range start is not aligned to the span covering the range.
    #[error("cacheable range start {start:#x} is not aligned to its {bits}-bit span")]
    UnalignedRange {
        /// Range start.
        start: u64,
        /// Width of the range span in bits.
        bits: u32,
    },

    /// Line and offset fields consume every range bit.
    #[error("no tag bits left: {range_bits} range bits, {line_bits} line bits, {offset_bits} offset bits")]
    NoTagBits {
        /// Bits spanned by the cacheable range.
        range_bits: u32,
        /// Line-index width.
        line_bits: u32,
        /// Word-offset width.
        offset_bits: u32,
    },

    /// Memory size is zero or not a whole number of words.
    #[error("memory size must be a non-zero multiple of 4 bytes, got {0}")]
    MemorySize(usize),

    /// Memory region extends past the 32-bit address space.
    #[error("memory at {base:#x} with {size} bytes exceeds the 32-bit address space")]
    MemoryRange {
        /// Region base.
        base: u32,
        /// Region size in bytes.
        size: usize,
    },

    /// Bus ports could not be wired to an arbiter.
    #[error("bus wiring failed: {0}")]
    Wiring(#[from] ArbiterError),

    /// Configuration text is not valid JSON for [`crate::config::Config`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A [`LineAddress`](crate::common::LineAddress) field does not fit its width.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// `value` needs more than `bits` bits.
    #[error("{field} value {value:#x} does not fit in {bits} bits")]
    FieldOverflow {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: u32,
        /// Field width.
        bits: u32,
    },
}

/// Invalid arbiter wiring.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ArbiterError {
    /// Two ports registered with the same priority.
    #[error("a port with priority {0} is already registered")]
    DuplicatePriority(u32),
}

/// Failure of a trace simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The trace did not drain within the cycle budget.
    #[error("simulation did not finish within {limit} cycles")]
    CycleLimit {
        /// Cycle budget.
        limit: u64,
    },

    /// The system could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The trace is not valid JSON.
    #[error("failed to parse trace: {0}")]
    Trace(#[from] serde_json::Error),

    /// The trace file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Direction of a faulting access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Data read.
    Load,
    /// Data write.
    Store,
    /// Instruction fetch.
    Fetch,
}

/// A bus error surfaced to the pipeline, with the address of the failing transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Fault {
    /// Access direction.
    pub kind: FaultKind,
    /// Address of the erroring bus transaction.
    pub addr: u32,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FaultKind::Load => "load",
            FaultKind::Store => "store",
            FaultKind::Fetch => "fetch",
        };
        write!(f, "{kind} bus error at {:#010x}", self.addr)
    }
}
