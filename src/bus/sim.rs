// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! In-memory register double for off-target testing.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use super::{HardwareBus, Reg};

/// Simulated register file.
///
/// One atomic byte per register of the device model, plus the global
/// interrupt flag and a counter of watchdog kicks. All accesses use relaxed
/// ordering: the target is a single hardware thread and the simulator only
/// needs the same one-access-at-a-time guarantee the real bus gives.
///
/// The simulator is deliberately dumb: it stores what it is told. Hardware
/// side effects that matter to the drivers (the watchdog change-enable bit
/// clearing itself four cycles after the unlock, input pins following output
/// pins in loopback rigs) are modeled by the tests that need them.
pub struct SimBus {
    regs: [AtomicU8; Reg::COUNT],
    irq_enabled: AtomicBool,
    kicks: AtomicU32,
}

impl SimBus {
    /// Creates a register file with every register zeroed and interrupts
    /// globally disabled, the power-on state of the target.
    pub fn new() -> Self {
        Self {
            regs: core::array::from_fn(|_| AtomicU8::new(0)),
            irq_enabled: AtomicBool::new(false),
            kicks: AtomicU32::new(0),
        }
    }

    /// Number of watchdog kicks issued so far.
    pub fn kick_count(&self) -> u32 {
        self.kicks.load(Ordering::Relaxed)
    }

    /// Drives an input register bit from the outside, simulating a level
    /// change on a physical line. `high` sets the bit, otherwise clears it.
    pub fn drive_input(&self, reg: Reg, mask: u8, high: bool) {
        if high {
            self.set_bits(reg, mask);
        } else {
            self.clear_bits(reg, mask);
        }
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareBus for SimBus {
    fn load(&self, reg: Reg) -> u8 {
        self.regs[reg.index()].load(Ordering::Relaxed)
    }

    fn store(&self, reg: Reg, value: u8) {
        self.regs[reg.index()].store(value, Ordering::Relaxed);
    }

    fn irq_enable(&self) {
        self.irq_enabled.store(true, Ordering::Relaxed);
    }

    fn irq_disable(&self) {
        self.irq_enabled.store(false, Ordering::Relaxed);
    }

    fn irq_enabled(&self) -> bool {
        self.irq_enabled.load(Ordering::Relaxed)
    }

    fn watchdog_kick(&self) {
        self.kicks.fetch_add(1, Ordering::Relaxed);
    }
}
