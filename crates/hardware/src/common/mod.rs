//! Common types shared by every component of the memory hierarchy.
//!
//! This module provides the value types that flow between the caches, the
//! load/store unit and the bus. It includes:
//! 1. **Address Types:** Field-packed address layout and decomposed line addresses.
//! 2. **Byte Lanes:** The 4-bit byte-select mask and its merge network.
//! 3. **Error Handling:** Construction errors and latched bus faults.
//! 4. **Priority Chains:** First-match-wins selection over ordered predicates.

/// Address layout and line address decomposition.
pub mod addr;

/// Byte-lane select masks.
pub mod data;

/// Error types and bus fault records.
pub mod error;

/// Ordered first-match selection.
pub mod priority;

pub use addr::{AddressLayout, BYTE_BITS, LineAddress};
pub use data::ByteSel;
pub use error::{AddressError, ArbiterError, ConfigError, Fault, FaultKind, SimError};
pub use priority::first_match;
