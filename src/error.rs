// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the HAL core.

use crate::timer::TimerCircuit;

/// Result type alias using HalError
pub type Result<T> = core::result::Result<T, HalError>;

/// Error types for the HAL core.
///
/// Every variant is a validation failure detected before any hardware or
/// registry mutation; a failed call leaves prior state untouched. An
/// unserviced watchdog timeout is not represented here - it is hardware
/// behavior (system reset), not an error value returned to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HalError {
    /// Logical pin outside the 0-19 range
    #[error("pin {0} is outside the logical pin range 0-19")]
    PinOutOfRange(u8),

    /// Pin already claimed by a live line
    #[error("pin {0} is already claimed by another line")]
    PinReserved(u8),

    /// Timer circuit already bound to a live timer
    #[error("timer circuit {0:?} is already bound to another timer")]
    CircuitReserved(TimerCircuit),

    /// Circuit selector outside the closed 0-2 enumeration
    #[error("unknown timer circuit selector {0}")]
    UnknownCircuit(u8),

    /// Dispatch-table index outside the table capacity
    #[error("callback slot {index} out of range (capacity {capacity})")]
    SlotOutOfRange {
        /// The rejected slot index
        index: usize,
        /// Capacity of the dispatch table
        capacity: usize,
    },
}
