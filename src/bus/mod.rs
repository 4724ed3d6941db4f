// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Hardware register interface.
//!
//! The driver layers never touch raw addresses; they name registers through
//! the closed [`Reg`] enumeration and go through a [`HardwareBus`]. Two
//! implementations exist: [`MmioBus`] for real memory-mapped hardware and
//! [`SimBus`], an in-memory double that makes every driver unit-testable off
//! target (interrupt dispatch is then simulated by calling the context
//! trampolines directly).
//!
//! # Interrupt safety
//!
//! Each read-modify-write helper is a single load followed by a single store
//! and is therefore safe with respect to interrupts only in isolation. A
//! sequence of accesses that must appear atomic to an interrupt (the watchdog
//! unlock window, multi-register configuration) must run inside
//! [`HardwareBus::critical`].

mod mmio;
mod sim;

pub use mmio::MmioBus;
pub use sim::SimBus;

use crate::bitops;

/// Registers of the device model.
///
/// Three 8-bit I/O ports (A, B, C), each with direction, output, input and
/// pin-interrupt-mask registers; one shared port-interrupt control register;
/// three timer circuits with control and tick-mask registers (circuit 1 also
/// has a compare register for its CTC tick); the watchdog control register
/// and the reset-cause flag register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    /// Port A direction register
    DirA,
    /// Port A output register
    OutA,
    /// Port A input register
    InA,
    /// Port A pin-interrupt mask register
    PinMaskA,
    /// Port B direction register
    DirB,
    /// Port B output register
    OutB,
    /// Port B input register
    InB,
    /// Port B pin-interrupt mask register
    PinMaskB,
    /// Port C direction register
    DirC,
    /// Port C output register
    OutC,
    /// Port C input register
    InC,
    /// Port C pin-interrupt mask register
    PinMaskC,
    /// Port-level interrupt enable control (one bit per port)
    PortIrqCtrl,
    /// Timer circuit 0 control register
    TimerCtrl0,
    /// Timer circuit 1 control register
    TimerCtrl1,
    /// Timer circuit 2 control register
    TimerCtrl2,
    /// Timer circuit 1 compare register (CTC top for the fixed tick)
    TimerCompare1,
    /// Timer circuit 0 tick-interrupt mask register
    TimerMask0,
    /// Timer circuit 1 tick-interrupt mask register
    TimerMask1,
    /// Timer circuit 2 tick-interrupt mask register
    TimerMask2,
    /// Watchdog control register
    WatchdogCtrl,
    /// Reset-cause flag register
    ResetFlags,
}

impl Reg {
    /// Number of registers in the device model.
    pub const COUNT: usize = 22;

    /// Dense index of the register, for table-backed buses.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Access to the hardware registers and the CPU-level interrupt gate.
///
/// `load`/`store` are single accesses. The global interrupt gate and the
/// watchdog kick live here too because they are CPU instructions rather than
/// register writes, but every implementation must provide them for the
/// drivers to be portable across the real bus and the simulator.
pub trait HardwareBus {
    /// Read a register.
    fn load(&self, reg: Reg) -> u8;

    /// Write a register.
    fn store(&self, reg: Reg, value: u8);

    /// Enable interrupts globally.
    fn irq_enable(&self);

    /// Disable interrupts globally.
    fn irq_disable(&self);

    /// True if interrupts are globally enabled.
    fn irq_enabled(&self) -> bool;

    /// Restart the watchdog countdown (the kick instruction).
    fn watchdog_kick(&self);

    /// Set every bit of `mask` in `reg`. One read-modify-write.
    fn set_bits(&self, reg: Reg, mask: u8) {
        self.store(reg, bitops::set(self.load(reg), mask));
    }

    /// Clear every bit of `mask` in `reg`. One read-modify-write.
    fn clear_bits(&self, reg: Reg, mask: u8) {
        self.store(reg, bitops::clear(self.load(reg), mask));
    }

    /// Flip every bit of `mask` in `reg`. One read-modify-write.
    fn toggle_bits(&self, reg: Reg, mask: u8) {
        self.store(reg, bitops::toggle(self.load(reg), mask));
    }

    /// True if at least one bit of `mask` is set in `reg`.
    fn read_any(&self, reg: Reg, mask: u8) -> bool {
        bitops::any(self.load(reg), mask)
    }

    /// Run `f` with interrupts globally disabled.
    ///
    /// Interrupts are re-enabled unconditionally afterwards, matching the
    /// single-threaded target where critical sections never nest.
    fn critical<R>(&self, f: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        self.irq_disable();
        let result = f();
        self.irq_enable();
        result
    }
}
