//! Load/Store Data Formatting.
//!
//! The bus and the caches move whole words. This module converts between
//! sub-word accesses and word lanes:
//! 1. **Byte Select:** Lanes touched by an access at a given byte offset.
//! 2. **Store Data:** Replication of the low byte/half to every lane.
//! 3. **Load Data:** Lane extraction with sign or zero extension.
//! 4. **Alignment:** Half-word accesses must be 2-aligned, words 4-aligned.

use serde::{Deserialize, Serialize};

use crate::common::ByteSel;

/// Width of a memory access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemWidth {
    /// 8-bit byte access.
    Byte,
    /// 16-bit half-word access.
    Half,
    /// 32-bit word access.
    #[default]
    Word,
}

/// Byte lanes covered by an access of `width` at `addr`.
pub const fn byte_sel(width: MemWidth, addr: u32) -> ByteSel {
    let offset = addr & 0b11;
    match width {
        MemWidth::Byte => ByteSel::from_bits(0b0001 << offset),
        MemWidth::Half => ByteSel::from_bits(0b0011 << (offset & 0b10)),
        MemWidth::Word => ByteSel::ALL,
    }
}

/// Replicates the low bits of `data` to every lane of its width.
pub const fn store_data(width: MemWidth, data: u32) -> u32 {
    match width {
        MemWidth::Byte => (data & 0xFF) * 0x0101_0101,
        MemWidth::Half => (data & 0xFFFF) * 0x0001_0001,
        MemWidth::Word => data,
    }
}

/// Extracts the lane addressed by `addr` from `word` and extends it to 32 bits.
///
/// # Arguments
///
/// * `width` - Access width.
/// * `signed` - Sign-extend instead of zero-extend.
/// * `addr` - Access address; only the byte offset is used.
/// * `word` - The full word read from the bus or cache.
pub const fn load_data(width: MemWidth, signed: bool, addr: u32, word: u32) -> u32 {
    let offset = addr & 0b11;
    match width {
        MemWidth::Byte => {
            let b = (word >> (8 * offset)) as u8;
            if signed { b as i8 as i32 as u32 } else { b as u32 }
        }
        MemWidth::Half => {
            let h = (word >> (8 * (offset & 0b10))) as u16;
            if signed { h as i16 as i32 as u32 } else { h as u32 }
        }
        MemWidth::Word => word,
    }
}

/// Returns true if an access of `width` at `addr` is not naturally aligned.
pub const fn is_misaligned(width: MemWidth, addr: u32) -> bool {
    match width {
        MemWidth::Byte => false,
        MemWidth::Half => addr & 0b01 != 0,
        MemWidth::Word => addr & 0b11 != 0,
    }
}
