// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Bitmask operations over unsigned register widths.
//!
//! These are the word-level primitives behind every register access in the
//! crate: the register bus builds its read-modify-write helpers on them and
//! the pin claim registry uses them directly on its u32 bitmask. Each helper
//! is a pure function on a value; atomicity with respect to interrupts is the
//! caller's concern (a single bus read-modify-write is safe in isolation,
//! multi-step sequences need a critical section).

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Unsigned word types a hardware register may have.
///
/// Sealed: the device model only has 8-, 16- and 32-bit registers.
pub trait RegisterWord:
    private::Sealed
    + Copy
    + Eq
    + core::ops::BitOr<Output = Self>
    + core::ops::BitAnd<Output = Self>
    + core::ops::BitXor<Output = Self>
    + core::ops::Not<Output = Self>
{
    /// The all-zero word.
    const ZERO: Self;
    /// The word with only the lowest bit set.
    const ONE: Self;
    /// Shift the word left by `n` bits.
    fn shl(self, n: u8) -> Self;
}

impl RegisterWord for u8 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    fn shl(self, n: u8) -> Self {
        self << n
    }
}

impl RegisterWord for u16 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    fn shl(self, n: u8) -> Self {
        self << n
    }
}

impl RegisterWord for u32 {
    const ZERO: Self = 0;
    const ONE: Self = 1;
    fn shl(self, n: u8) -> Self {
        self << n
    }
}

/// Mask with the single bit `n` set.
#[inline]
pub fn bit<T: RegisterWord>(n: u8) -> T {
    T::ONE.shl(n)
}

/// Word with every bit of `mask` set.
#[inline]
pub fn set<T: RegisterWord>(word: T, mask: T) -> T {
    word | mask
}

/// Word with every bit of `mask` cleared.
#[inline]
pub fn clear<T: RegisterWord>(word: T, mask: T) -> T {
    word & !mask
}

/// Word with every bit of `mask` flipped.
#[inline]
pub fn toggle<T: RegisterWord>(word: T, mask: T) -> T {
    word ^ mask
}

/// True if at least one bit of `mask` is set in `word`.
#[inline]
pub fn any<T: RegisterWord>(word: T, mask: T) -> bool {
    word & mask != T::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_clear_toggle_u8() {
        let mut word: u8 = 0;
        word = set(word, bit(3));
        assert_eq!(word, 0b0000_1000);
        word = toggle(word, bit::<u8>(3) | bit::<u8>(0));
        assert_eq!(word, 0b0000_0001);
        word = clear(word, bit(0));
        assert_eq!(word, 0);
    }

    #[test]
    fn test_any_multi_bit() {
        let word: u8 = 0b0100_0000;
        assert!(any(word, bit::<u8>(6) | bit::<u8>(1)));
        assert!(!any(word, bit::<u8>(5) | bit::<u8>(1)));
    }

    #[test]
    fn test_u32_width() {
        let mut word: u32 = 0;
        word = set(word, bit(19));
        assert!(any(word, bit::<u32>(19)));
        word = clear(word, bit(19));
        assert_eq!(word, 0);
    }
}
