// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Watchdog supervisor.
//!
//! The watchdog is the system's deadman switch: the main loop must call
//! [`WatchdogSupervisor::reset`] before the configured timeout elapses or
//! the hardware takes over - a full system reset when reset mode is enabled,
//! and/or an interrupt when interrupt mode is enabled. The countdown runs in
//! hardware, independent of anything software schedules, which is what makes
//! it the backstop against a locked-up main loop.
//!
//! Every configuration write goes through a two-step unlock (set the
//! change-enable bit together with the system-reset bit, then write the new
//! configuration) inside a critical section; if the unlock window is
//! interrupted the hardware silently ignores the write.

use log::debug;

use crate::bus::{HardwareBus, Reg};
use crate::context::HardwareContext;
use crate::dispatch::Callback;

/// Watchdog interrupt enable bit in the control register.
pub const WDT_IRQ_ENABLE: u8 = 1 << 6;
/// Change-enable bit opening the configuration unlock window.
pub const WDT_CHANGE_ENABLE: u8 = 1 << 4;
/// System-reset enable bit in the control register.
pub const WDT_SYSTEM_RESET: u8 = 1 << 3;
/// Watchdog reset-cause flag in the reset-flags register.
pub const WDT_RESET_FLAG: u8 = 1 << 3;

/// Hardware-defined watchdog timeout periods.
///
/// The discriminants are the prescaler bit patterns written to the control
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Timeout {
    /// 16 ms
    Ms16 = 0x00,
    /// 32 ms
    Ms32 = 0x01,
    /// 64 ms
    Ms64 = 0x02,
    /// 128 ms
    Ms128 = 0x03,
    /// 256 ms
    Ms256 = 0x04,
    /// 512 ms
    Ms512 = 0x05,
    /// 1024 ms
    Ms1024 = 0x06,
    /// 2048 ms
    Ms2048 = 0x07,
    /// 4096 ms
    Ms4096 = 0x20,
    /// 8192 ms
    Ms8192 = 0x21,
}

impl Timeout {
    /// The prescaler bits of the timeout.
    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// The timeout period in milliseconds.
    pub fn as_millis(self) -> u32 {
        match self {
            Timeout::Ms16 => 16,
            Timeout::Ms32 => 32,
            Timeout::Ms64 => 64,
            Timeout::Ms128 => 128,
            Timeout::Ms256 => 256,
            Timeout::Ms512 => 512,
            Timeout::Ms1024 => 1024,
            Timeout::Ms2048 => 2048,
            Timeout::Ms4096 => 4096,
            Timeout::Ms8192 => 8192,
        }
    }
}

/// Handle to the per-context watchdog singleton.
///
/// The handle carries no state; everything lives in the context (and in the
/// watchdog hardware itself). It is never destroyed, only reconfigured.
pub struct WatchdogSupervisor<'a, B: HardwareBus> {
    ctx: &'a HardwareContext<B>,
}

impl<'a, B: HardwareBus> WatchdogSupervisor<'a, B> {
    pub(crate) fn new(ctx: &'a HardwareContext<B>) -> Self {
        Self { ctx }
    }

    /// Selects the watchdog timeout.
    ///
    /// The unlock write and the configuration write must appear atomic to
    /// interrupts, hence the critical section. Note that the configuration
    /// write replaces the whole control register, so mode bits are set
    /// afterwards via [`WatchdogSupervisor::enable_system_reset`] or
    /// [`WatchdogSupervisor::enable_interrupt`].
    pub fn init(&self, timeout: Timeout) {
        let bus = self.ctx.bus();
        bus.critical(|| {
            bus.set_bits(Reg::WatchdogCtrl, WDT_CHANGE_ENABLE | WDT_SYSTEM_RESET);
            bus.store(Reg::WatchdogCtrl, timeout.bits());
        });
        debug!("[WDT] timeout set to {} ms", timeout.as_millis());
    }

    /// Re-arms the countdown and clears the pending reset-cause flag.
    ///
    /// Must be called more often than the configured timeout; withholding it
    /// is the fatal path by design.
    pub fn reset(&self) {
        let bus = self.ctx.bus();
        bus.critical(|| {
            bus.watchdog_kick();
            bus.clear_bits(Reg::ResetFlags, WDT_RESET_FLAG);
        });
    }

    /// Makes an elapsed timeout trigger a full system reset.
    pub fn enable_system_reset(&self) {
        self.reset();
        let bus = self.ctx.bus();
        bus.critical(|| {
            bus.set_bits(Reg::WatchdogCtrl, WDT_CHANGE_ENABLE | WDT_SYSTEM_RESET);
            bus.set_bits(Reg::WatchdogCtrl, WDT_SYSTEM_RESET);
        });
        debug!("[WDT] system reset on timeout enabled");
    }

    /// Keeps the system running even if the timeout elapses.
    pub fn disable_system_reset(&self) {
        self.reset();
        let bus = self.ctx.bus();
        bus.critical(|| {
            bus.set_bits(Reg::WatchdogCtrl, WDT_CHANGE_ENABLE | WDT_SYSTEM_RESET);
            bus.clear_bits(Reg::WatchdogCtrl, WDT_SYSTEM_RESET);
        });
        debug!("[WDT] system reset on timeout disabled");
    }

    /// Makes an elapsed timeout invoke `callback` instead of (or in addition
    /// to) the reset.
    ///
    /// The hardware disables the watchdog interrupt after it fires exactly
    /// once; the interrupt trampoline re-arms through this method before
    /// invoking the callback, so continuous monitoring needs no action from
    /// the callback itself.
    pub fn enable_interrupt(&self, callback: Callback) {
        *self.ctx.watchdog_callback.lock() = Some(callback);
        self.reset();
        let bus = self.ctx.bus();
        bus.critical(|| {
            bus.set_bits(Reg::WatchdogCtrl, WDT_CHANGE_ENABLE | WDT_SYSTEM_RESET);
            bus.set_bits(Reg::WatchdogCtrl, WDT_IRQ_ENABLE);
        });
    }

    /// Disables the timeout interrupt and forgets the registered callback.
    pub fn disable_interrupt(&self) {
        *self.ctx.watchdog_callback.lock() = None;
        self.reset();
        let bus = self.ctx.bus();
        bus.critical(|| {
            bus.set_bits(Reg::WatchdogCtrl, WDT_CHANGE_ENABLE | WDT_SYSTEM_RESET);
            bus.clear_bits(Reg::WatchdogCtrl, WDT_IRQ_ENABLE);
        });
    }

    /// True if the timeout interrupt is currently armed.
    pub fn is_interrupt_enabled(&self) -> bool {
        self.ctx.bus().read_any(Reg::WatchdogCtrl, WDT_IRQ_ENABLE)
    }
}
