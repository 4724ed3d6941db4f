// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Claim registries for single-owner hardware resources.
//!
//! One bit per resource: bit set means exactly one live driver instance owns
//! that resource. The same registry type arbitrates logical pins (20 entries)
//! and timer circuits (3 entries).

use parking_lot::Mutex;

use crate::bitops;

/// Bitmask registry recording which resources are currently claimed.
pub struct ClaimRegistry {
    bits: Mutex<u32>,
    capacity: u8,
}

impl ClaimRegistry {
    /// Creates an empty registry arbitrating ids `0..capacity`.
    pub fn new(capacity: u8) -> Self {
        debug_assert!(capacity <= 32);
        Self {
            bits: Mutex::new(0),
            capacity,
        }
    }

    /// Claims `id` if it is in range and unclaimed.
    ///
    /// Returns true on success. A failed claim mutates nothing.
    pub fn try_claim(&self, id: u8) -> bool {
        if id >= self.capacity {
            return false;
        }
        let mut bits = self.bits.lock();
        if bitops::any(*bits, bitops::bit(id)) {
            return false;
        }
        *bits = bitops::set(*bits, bitops::bit(id));
        true
    }

    /// Releases `id`. Releasing an unclaimed id is a no-op.
    pub fn release(&self, id: u8) {
        if id >= self.capacity {
            return;
        }
        let mut bits = self.bits.lock();
        *bits = bitops::clear(*bits, bitops::bit(id));
    }

    /// True if `id` is currently claimed.
    pub fn is_claimed(&self, id: u8) -> bool {
        if id >= self.capacity {
            return false;
        }
        bitops::any(*self.bits.lock(), bitops::bit(id))
    }

    /// The raw claim bitmask.
    pub fn claimed_mask(&self) -> u32 {
        *self.bits.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_release_round_trip() {
        let registry = ClaimRegistry::new(20);
        let before = registry.claimed_mask();
        assert!(registry.try_claim(13));
        registry.release(13);
        assert_eq!(registry.claimed_mask(), before);
    }

    #[test]
    fn test_double_claim_fails() {
        let registry = ClaimRegistry::new(20);
        assert!(registry.try_claim(5));
        assert!(!registry.try_claim(5));
        assert!(registry.is_claimed(5));
    }

    #[test]
    fn test_out_of_range() {
        let registry = ClaimRegistry::new(3);
        assert!(!registry.try_claim(3));
        assert!(!registry.is_claimed(3));
        registry.release(3); // no-op, must not panic
    }

    #[test]
    fn test_full_pin_range() {
        let registry = ClaimRegistry::new(20);
        for pin in 0..20 {
            assert!(registry.try_claim(pin));
        }
        assert_eq!(registry.claimed_mask(), 0x000F_FFFF);
        for pin in 0..20 {
            registry.release(pin);
        }
        assert_eq!(registry.claimed_mask(), 0);
    }
}
