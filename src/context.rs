// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Root hardware context and interrupt trampolines.
//!
//! All process-wide driver state of the original target (claim bitmasks,
//! dispatch tables, tick counters, the watchdog callback) lives in one
//! explicit [`HardwareContext`] instead of globals, so independent contexts
//! can exist side by side in tests with a simulated register bus behind each.
//!
//! The `isr_*` methods are the well-known per-vector entry points. On real
//! hardware each interrupt vector forwards to the matching method; in tests
//! they are called directly to simulate an interrupt. Handler bodies are
//! minimal and non-blocking: read or bump unit state, then dispatch.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::bus::HardwareBus;
use crate::dispatch::{Callback, CallbackTable};
use crate::gpio::{IoPort, NUM_PINS, NUM_PORTS};
use crate::registry::ClaimRegistry;
use crate::timer::{TimerCircuit, NUM_CIRCUITS};
use crate::watchdog::WatchdogSupervisor;

/// Per-circuit software timer state, mutated from interrupt context.
///
/// All fields are relaxed atomics: the target is a single hardware thread
/// and each field is read and written one access at a time.
pub(crate) struct TimerChannel {
    threshold: AtomicU32,
    counter: AtomicU32,
    enabled: AtomicBool,
}

impl TimerChannel {
    fn new() -> Self {
        Self {
            threshold: AtomicU32::new(0),
            counter: AtomicU32::new(0),
            enabled: AtomicBool::new(false),
        }
    }

    /// Bumps the tick counter if the channel is enabled.
    ///
    /// Returns true if the counter was incremented.
    pub(crate) fn increment(&self) -> bool {
        let enabled = self.enabled.load(Ordering::Relaxed);
        if enabled {
            self.counter.fetch_add(1, Ordering::Relaxed);
        }
        enabled
    }

    /// True once the counter reaches the threshold; the counter then resets
    /// to zero so the timer repeats indefinitely (periodic, not one-shot).
    pub(crate) fn has_elapsed(&self) -> bool {
        if !self.enabled.load(Ordering::Relaxed) {
            return false;
        }
        let threshold = self.threshold.load(Ordering::Relaxed);
        if threshold == 0 || self.counter.load(Ordering::Relaxed) < threshold {
            false
        } else {
            self.counter.store(0, Ordering::Relaxed);
            true
        }
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_threshold(&self, ticks: u32) {
        self.threshold.store(ticks, Ordering::Relaxed);
    }

    pub(crate) fn threshold(&self) -> u32 {
        self.threshold.load(Ordering::Relaxed)
    }

    pub(crate) fn reset_counter(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}

/// Root driver state: the register bus plus every shared table the drivers
/// and interrupt trampolines touch.
pub struct HardwareContext<B: HardwareBus> {
    pub(crate) bus: B,
    pub(crate) pins: ClaimRegistry,
    pub(crate) circuits: ClaimRegistry,
    pub(crate) port_callbacks: CallbackTable<NUM_PORTS>,
    pub(crate) timer_callbacks: CallbackTable<NUM_CIRCUITS>,
    pub(crate) channels: [TimerChannel; NUM_CIRCUITS],
    pub(crate) watchdog_callback: Mutex<Option<Callback>>,
}

impl<B: HardwareBus> HardwareContext<B> {
    /// Creates a context over `bus` with nothing claimed and every dispatch
    /// slot empty.
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            pins: ClaimRegistry::new(NUM_PINS),
            circuits: ClaimRegistry::new(NUM_CIRCUITS as u8),
            port_callbacks: CallbackTable::new(),
            timer_callbacks: CallbackTable::new(),
            channels: [TimerChannel::new(), TimerChannel::new(), TimerChannel::new()],
            watchdog_callback: Mutex::new(None),
        }
    }

    /// The register bus behind this context.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The watchdog supervisor of this context.
    ///
    /// The supervisor is a per-context singleton: the handle carries no
    /// state of its own and may be taken any number of times.
    pub fn watchdog(&self) -> WatchdogSupervisor<'_, B> {
        WatchdogSupervisor::new(self)
    }

    /// True if `pin` is currently claimed by a live line.
    pub fn is_pin_claimed(&self, pin: u8) -> bool {
        self.pins.is_claimed(pin)
    }

    /// Enables pin-change interrupts on an entire port, regardless of
    /// individual pin masks. Used to reopen a debounce window.
    pub fn enable_port_interrupts(&self, port: IoPort) {
        self.bus.irq_enable();
        self.bus.set_bits(crate::bus::Reg::PortIrqCtrl, port.irq_ctrl_bit());
    }

    /// Disables pin-change interrupts on an entire port, regardless of
    /// individual pin masks. Used to open a debounce window after an edge.
    pub fn disable_port_interrupts(&self, port: IoPort) {
        self.bus.clear_bits(crate::bus::Reg::PortIrqCtrl, port.irq_ctrl_bit());
    }

    /// Pin-change vector trampoline for `port`.
    ///
    /// One vector serves all pins of the port, so the registered callback is
    /// invoked once per event no matter which pin changed.
    pub fn isr_pin_change(&self, port: IoPort) {
        self.port_callbacks.call(port.index());
    }

    /// Tick vector trampoline for `circuit`.
    ///
    /// Bumps the circuit's tick counter and fires the circuit's dispatch
    /// slot when the elapse threshold is reached.
    pub fn isr_timer_tick(&self, circuit: TimerCircuit) {
        let channel = &self.channels[circuit.index()];
        channel.increment();
        if channel.has_elapsed() {
            self.timer_callbacks.call(circuit.index());
        }
    }

    /// Watchdog vector trampoline.
    ///
    /// The hardware auto-disables the watchdog interrupt after it fires
    /// once, so the trampoline re-arms before invoking the callback. Without
    /// the re-arm a second timeout would reset the system (if system reset
    /// is enabled) or pass silently.
    pub fn isr_watchdog(&self) {
        let callback = *self.watchdog_callback.lock();
        if let Some(callback) = callback {
            self.watchdog().enable_interrupt(callback);
            callback();
        } else {
            debug!("[WDT] timeout interrupt with no callback registered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimBus;

    #[test]
    fn test_independent_contexts() {
        let ctx_a = HardwareContext::new(SimBus::new());
        let ctx_b = HardwareContext::new(SimBus::new());
        assert!(ctx_a.pins.try_claim(4));
        assert!(!ctx_a.is_pin_claimed(7));
        // Claims in one context are invisible to the other.
        assert!(!ctx_b.is_pin_claimed(4));
        assert!(ctx_b.pins.try_claim(4));
    }

    #[test]
    fn test_channel_periodic_elapse() {
        let channel = TimerChannel::new();
        channel.set_threshold(4);
        channel.set_enabled(true);
        for cycle in 0..3 {
            for tick in 0..4 {
                assert!(channel.increment());
                let elapsed = channel.has_elapsed();
                assert_eq!(elapsed, tick == 3, "cycle {cycle} tick {tick}");
            }
        }
    }

    #[test]
    fn test_channel_disabled_does_not_count() {
        let channel = TimerChannel::new();
        channel.set_threshold(1);
        assert!(!channel.increment());
        assert!(!channel.has_elapsed());
    }

    #[test]
    fn test_isr_pin_change_empty_slot_is_noop() {
        let ctx = HardwareContext::new(SimBus::new());
        ctx.isr_pin_change(IoPort::A); // must not panic
        ctx.isr_timer_tick(TimerCircuit::Timer1);
        ctx.isr_watchdog();
    }
}
