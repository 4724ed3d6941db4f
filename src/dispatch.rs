// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Callback dispatch tables.
//!
//! One fixed-capacity table per family of hardware units sharing an
//! interrupt scheme: three slots for the I/O ports, three for the timer
//! circuits, one for the watchdog. `call` runs inside the interrupt
//! trampoline, so registered callbacks must be short and must never block on
//! a condition that only another interrupt can resolve.

use parking_lot::Mutex;

use crate::error::{HalError, Result};

/// Callback signature shared by every dispatch slot.
///
/// No arguments and no return value: a port slot serves all pins of its port
/// (one hardware vector per port), so the callback body re-reads line state
/// to find out what changed.
pub type Callback = fn();

/// Fixed-capacity table of optional callbacks, one slot per hardware unit.
pub struct CallbackTable<const N: usize> {
    slots: Mutex<[Option<Callback>; N]>,
}

impl<const N: usize> CallbackTable<N> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new([None; N]),
        }
    }

    /// Stores `callback` at `index`.
    ///
    /// An occupied slot is overwritten - last writer wins. Only the index is
    /// validated (a null callback cannot be expressed in this API).
    pub fn add(&self, callback: Callback, index: usize) -> Result<()> {
        if index >= N {
            return Err(HalError::SlotOutOfRange {
                index,
                capacity: N,
            });
        }
        self.slots.lock()[index] = Some(callback);
        Ok(())
    }

    /// Clears the slot at `index`, occupied or not.
    pub fn remove(&self, index: usize) -> Result<()> {
        if index >= N {
            return Err(HalError::SlotOutOfRange {
                index,
                capacity: N,
            });
        }
        self.slots.lock()[index] = None;
        Ok(())
    }

    /// Scans for a slot holding `callback` and clears it.
    ///
    /// Returns true if a matching slot was found.
    pub fn remove_matching(&self, callback: Callback) -> bool {
        let mut slots = self.slots.lock();
        for slot in slots.iter_mut() {
            if *slot == Some(callback) {
                *slot = None;
                return true;
            }
        }
        false
    }

    /// Invokes the callback at `index` synchronously.
    ///
    /// No-op returning false on an empty slot or an out-of-range index.
    /// Runs in interrupt context; the callback completes before control
    /// returns to the preempted main loop.
    pub fn call(&self, index: usize) -> bool {
        let callback = match self.slots.lock().get(index) {
            Some(&slot) => slot,
            None => None,
        };
        // The lock is released before the call so a callback may re-register
        // or remove itself through the same table.
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// True if the slot at `index` holds a callback.
    pub fn is_set(&self, index: usize) -> bool {
        matches!(self.slots.lock().get(index), Some(Some(_)))
    }
}

impl<const N: usize> Default for CallbackTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
