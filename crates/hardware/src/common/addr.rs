//! Cache Address Layout.
//!
//! A 32-bit address seen by a cache is split, most-significant first, into
//! `tag`, `line`, `offset` (word within the line) and `byte` (ignored by the
//! cache). This module provides:
//! 1. **Layout:** Field widths derived and validated from the cache geometry.
//! 2. **Decomposition:** Splitting a raw address into a [`LineAddress`].
//! 3. **Composition:** Rebuilding a raw bus address from a [`LineAddress`].
//! 4. **Range Check:** Classifying addresses as cacheable or bypassed.

use crate::common::error::{AddressError, ConfigError};

/// Width of the byte-offset field; the bus moves 32-bit words.
pub const BYTE_BITS: u32 = 2;

/// Ceiling of log2 for a non-zero span.
const fn ceil_log2(n: u64) -> u32 {
    if n <= 1 { 0 } else { u64::BITS - (n - 1).leading_zeros() }
}

/// Bit widths and positions of the address fields for one cache geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressLayout {
    offset_bits: u32,
    line_bits: u32,
    tag_bits: u32,
    range_bits: u32,
    range_start: u64,
}

impl AddressLayout {
    /// Derives the layout for a cache geometry.
    ///
    /// # Arguments
    ///
    /// * `nlines` - Number of lines per way, a non-zero power of two.
    /// * `nwords` - Words per line, one of 4, 8 or 16.
    /// * `start` - First cacheable address.
    /// * `end` - One past the last cacheable address, at most `2^32`.
    ///
    /// # Returns
    ///
    /// The layout, or the first geometry rule the parameters break. The
    /// range start must be aligned to the power-of-two span covering the
    /// range, since cacheability is decided by comparing the bits above it.
    pub fn from_geometry(nlines: usize, nwords: usize, start: u64, end: u64) -> Result<Self, ConfigError> {
        if nlines == 0 || !nlines.is_power_of_two() {
            return Err(ConfigError::LineCount(nlines));
        }
        if !matches!(nwords, 4 | 8 | 16) {
            return Err(ConfigError::WordsPerLine(nwords));
        }
        if start >= end || end > 1 << 32 {
            return Err(ConfigError::Range { start, end });
        }

        let range_bits = ceil_log2(end - start);
        if start & ((1u64 << range_bits) - 1) != 0 {
            return Err(ConfigError::UnalignedRange { start, bits: range_bits });
        }

        let offset_bits = nwords.trailing_zeros();
        let line_bits = nlines.trailing_zeros();
        let used = line_bits + offset_bits + BYTE_BITS;
        if range_bits <= used {
            return Err(ConfigError::NoTagBits { range_bits, line_bits, offset_bits });
        }

        Ok(Self {
            offset_bits,
            line_bits,
            tag_bits: range_bits - used,
            range_bits,
            range_start: start,
        })
    }

    /// Width of the word-offset field.
    #[inline]
    pub const fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Width of the line-index field.
    #[inline]
    pub const fn line_bits(&self) -> u32 {
        self.line_bits
    }

    /// Width of the tag field.
    #[inline]
    pub const fn tag_bits(&self) -> u32 {
        self.tag_bits
    }

    /// Number of address bits spanned by the cacheable range.
    #[inline]
    pub const fn range_bits(&self) -> u32 {
        self.range_bits
    }

    /// Lines per way.
    #[inline]
    pub const fn nlines(&self) -> usize {
        1 << self.line_bits
    }

    /// Words per line.
    #[inline]
    pub const fn nwords(&self) -> usize {
        1 << self.offset_bits
    }

    const fn mask(bits: u32) -> u32 {
        ((1u64 << bits) - 1) as u32
    }

    const fn line_shift(&self) -> u32 {
        BYTE_BITS + self.offset_bits
    }

    const fn tag_shift(&self) -> u32 {
        BYTE_BITS + self.offset_bits + self.line_bits
    }

    /// Returns true if `addr` falls in the cacheable range.
    ///
    /// Only the bits above the range span are compared, so the whole
    /// power-of-two window starting at the range base is cacheable.
    pub const fn is_cacheable(&self, addr: u32) -> bool {
        (addr as u64) >> self.range_bits == self.range_start >> self.range_bits
    }

    /// Splits a raw address into its cache fields.
    pub const fn decompose(&self, addr: u32) -> LineAddress {
        LineAddress {
            tag: (addr >> self.tag_shift()) & Self::mask(self.tag_bits),
            line: (addr >> self.line_shift()) & Self::mask(self.line_bits),
            offset: (addr >> BYTE_BITS) & Self::mask(self.offset_bits),
            byte: addr & Self::mask(BYTE_BITS),
        }
    }

    /// Rebuilds the raw address of `la`.
    ///
    /// Bits above the tag come from the cacheable range base.
    pub const fn compose(&self, la: &LineAddress) -> u32 {
        let high = (self.range_start >> self.range_bits) << self.range_bits;
        let low = ((la.tag as u64) << self.tag_shift())
            | ((la.line as u64) << self.line_shift())
            | ((la.offset as u64) << BYTE_BITS)
            | la.byte as u64;
        (high | low) as u32
    }
}

/// An address decomposed into cache fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LineAddress {
    tag: u32,
    line: u32,
    offset: u32,
    byte: u32,
}

impl LineAddress {
    /// Builds a line address, checking every field against its width.
    ///
    /// # Arguments
    ///
    /// * `layout` - The layout whose field widths apply.
    /// * `tag`, `line`, `offset`, `byte` - Field values.
    ///
    /// # Returns
    ///
    /// `AddressError::FieldOverflow` naming the first field that does not fit.
    pub fn new(layout: &AddressLayout, tag: u32, line: u32, offset: u32, byte: u32) -> Result<Self, AddressError> {
        let check = |field: &'static str, value: u32, bits: u32| {
            if u64::from(value) >> bits == 0 {
                Ok(())
            } else {
                Err(AddressError::FieldOverflow { field, value, bits })
            }
        };
        check("tag", tag, layout.tag_bits)?;
        check("line", line, layout.line_bits)?;
        check("offset", offset, layout.offset_bits)?;
        check("byte", byte, BYTE_BITS)?;
        Ok(Self { tag, line, offset, byte })
    }

    /// Tag field.
    #[inline]
    pub const fn tag(&self) -> u32 {
        self.tag
    }

    /// Line index field.
    #[inline]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Word offset within the line.
    #[inline]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Byte offset within the word.
    #[inline]
    pub const fn byte(&self) -> u32 {
        self.byte
    }

    /// Returns a copy with the word offset replaced, wrapping modulo the line size.
    pub const fn with_offset(self, layout: &AddressLayout, offset: u32) -> Self {
        Self {
            offset: offset & AddressLayout::mask(layout.offset_bits),
            byte: 0,
            ..self
        }
    }

    /// Returns true if both addresses name the same line.
    #[inline]
    pub const fn same_line(&self, other: &Self) -> bool {
        self.tag == other.tag && self.line == other.line
    }
}
