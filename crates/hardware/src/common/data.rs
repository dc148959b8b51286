//! Byte-Lane Selection.
//!
//! The bus and the data arrays move whole 32-bit words; partial stores carry
//! a 4-bit byte-select mask naming the lanes to overwrite. Lane `i` covers
//! bits `8*i .. 8*i+8` of the word.

use serde::{Deserialize, Serialize};

/// A 4-bit byte-lane mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteSel(u8);

impl ByteSel {
    /// No lanes selected.
    pub const NONE: Self = Self(0);

    /// All four lanes selected.
    pub const ALL: Self = Self(0b1111);

    /// Builds a mask from its low four bits; higher bits are dropped.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    /// Raw mask bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if lane `lane` is selected.
    #[inline]
    pub const fn lane(self, lane: u32) -> bool {
        lane < 4 && self.0 & (1 << lane) != 0
    }

    /// Returns true if no lane is selected.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Expands the mask to a 32-bit bit mask (`0xFF` per selected lane).
    pub const fn word_mask(self) -> u32 {
        let mut mask = 0;
        let mut lane = 0;
        while lane < 4 {
            if self.lane(lane) {
                mask |= 0xFF << (8 * lane);
            }
            lane += 1;
        }
        mask
    }

    /// Combines `old` and `new`: selected lanes come from `new`, the rest from `old`.
    #[inline]
    pub const fn merge(self, old: u32, new: u32) -> u32 {
        let mask = self.word_mask();
        (old & !mask) | (new & mask)
    }
}

impl From<ByteSel> for u8 {
    fn from(sel: ByteSel) -> Self {
        sel.bits()
    }
}
