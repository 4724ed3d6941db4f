// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Memory-mapped register bus for real hardware.

use super::{HardwareBus, Reg};

/// Register bus backed by raw memory-mapped addresses.
///
/// Built from a caller-supplied address table, one pointer per [`Reg`]
/// entry, so the same driver stack runs on any part with this register
/// complement regardless of where the vendor placed the registers.
pub struct MmioBus {
    map: [*mut u8; Reg::COUNT],
}

// The pointers target device registers, not CPU-owned memory; every access
// goes through a single volatile load or store.
unsafe impl Send for MmioBus {}
unsafe impl Sync for MmioBus {}

impl MmioBus {
    /// Creates a bus over the given register address table, indexed by
    /// [`Reg::index`].
    ///
    /// # Safety
    ///
    /// Every pointer must be the valid memory-mapped address of the
    /// corresponding register for the lifetime of the bus, and nothing else
    /// may alias those addresses as ordinary memory.
    pub unsafe fn new(map: [*mut u8; Reg::COUNT]) -> Self {
        Self { map }
    }
}

impl HardwareBus for MmioBus {
    fn load(&self, reg: Reg) -> u8 {
        unsafe { self.map[reg.index()].read_volatile() }
    }

    fn store(&self, reg: Reg, value: u8) {
        unsafe { self.map[reg.index()].write_volatile(value) }
    }

    #[cfg(target_arch = "avr")]
    fn irq_enable(&self) {
        unsafe { core::arch::asm!("sei") }
    }

    #[cfg(target_arch = "avr")]
    fn irq_disable(&self) {
        unsafe { core::arch::asm!("cli") }
    }

    #[cfg(target_arch = "avr")]
    fn irq_enabled(&self) -> bool {
        let sreg: u8;
        unsafe { core::arch::asm!("in {0}, 0x3f", out(reg) sreg) }
        sreg & 0x80 != 0
    }

    #[cfg(target_arch = "avr")]
    fn watchdog_kick(&self) {
        unsafe { core::arch::asm!("wdr") }
    }

    // Host builds of the MMIO bus exist only so the crate compiles on
    // development machines; the CPU-level instructions have no meaning there.
    #[cfg(not(target_arch = "avr"))]
    fn irq_enable(&self) {}

    #[cfg(not(target_arch = "avr"))]
    fn irq_disable(&self) {}

    #[cfg(not(target_arch = "avr"))]
    fn irq_enabled(&self) -> bool {
        false
    }

    #[cfg(not(target_arch = "avr"))]
    fn watchdog_kick(&self) {}
}
