//! Inclusive bit ranges within 32-bit tokens.
//!
//! Every field of the SM4/SM5 token format is described by a [`BitRange`].
//! Ranges used as constants are checked when the constant is evaluated; ranges
//! built from runtime values go through [`BitRange::checked`], [`get_bits`] or
//! [`set_bits`], which reject anything outside `0 <= lo <= hi <= 31`.

use thiserror::Error;

/// A bit range `[lo, hi]` was outside `0 <= lo <= hi <= 31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid bit range [{lo}, {hi}] (need 0 <= lo <= hi <= 31)")]
pub struct InvalidBitRange {
    /// Requested low bit.
    pub lo: u32,
    /// Requested high bit.
    pub hi: u32,
}

/// An inclusive range of bits within a `u32`, bit 0 being least significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    lo: u8,
    hi: u8,
}

impl BitRange {
    /// Creates the range `[lo, hi]`.
    ///
    /// # Panics
    ///
    /// Panics if the range is invalid. In a `const` item this is a compile
    /// error.
    pub const fn new(lo: u32, hi: u32) -> Self {
        assert!(lo <= hi && hi <= 31, "invalid bit range");
        Self {
            lo: lo as u8,
            hi: hi as u8,
        }
    }

    /// The single-bit range `[bit, bit]`.
    pub const fn bit(bit: u32) -> Self {
        Self::new(bit, bit)
    }

    /// Creates the range `[lo, hi]`, rejecting invalid bounds.
    pub const fn checked(lo: u32, hi: u32) -> Result<Self, InvalidBitRange> {
        if lo <= hi && hi <= 31 {
            Ok(Self {
                lo: lo as u8,
                hi: hi as u8,
            })
        } else {
            Err(InvalidBitRange { lo, hi })
        }
    }

    /// Lowest bit of the range.
    pub const fn lo(self) -> u32 {
        self.lo as u32
    }

    /// Highest bit of the range, inclusive.
    pub const fn hi(self) -> u32 {
        self.hi as u32
    }

    /// Number of bits covered.
    pub const fn width(self) -> u32 {
        self.hi() - self.lo() + 1
    }

    /// All-ones value of [`width`](Self::width) bits, not shifted.
    pub const fn value_mask(self) -> u32 {
        u32::MAX >> (32 - self.width())
    }

    /// The range's bits in place within a word.
    pub const fn field_mask(self) -> u32 {
        self.value_mask() << self.lo()
    }

    /// Largest value the range can hold.
    pub const fn max_value(self) -> u32 {
        self.value_mask()
    }

    /// Extracts the field, shifted down to bit 0.
    pub const fn get(self, word: u32) -> u32 {
        (word >> self.lo()) & self.value_mask()
    }

    /// Returns `word` with the field replaced by `value`.
    ///
    /// Bits of `value` above the field width are dropped.
    pub const fn set(self, word: u32, value: u32) -> u32 {
        (word & !self.field_mask()) | ((value & self.value_mask()) << self.lo())
    }

    /// Returns a word holding only `value` in this field.
    pub const fn place(self, value: u32) -> u32 {
        self.set(0, value)
    }

    /// Whether `value` fits in the field without truncation.
    pub const fn fits(self, value: u32) -> bool {
        value <= self.max_value()
    }
}

/// Extracts bits `[lo, hi]` of `word`, shifted down to bit 0.
pub fn get_bits(word: u32, lo: u32, hi: u32) -> Result<u32, InvalidBitRange> {
    let range = BitRange::checked(lo, hi);
    debug_assert!(range.is_ok(), "invalid bit range [{lo}, {hi}]");
    Ok(range?.get(word))
}

/// Clears bits `[lo, hi]` of `word` and writes `value` into them.
///
/// Bits outside the range are left untouched; bits of `value` above the range
/// width are dropped.
pub fn set_bits(word: &mut u32, lo: u32, hi: u32, value: u32) -> Result<(), InvalidBitRange> {
    let range = BitRange::checked(lo, hi);
    debug_assert!(range.is_ok(), "invalid bit range [{lo}, {hi}]");
    *word = range?.set(*word, value);
    Ok(())
}
