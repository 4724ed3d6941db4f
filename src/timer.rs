// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! Software timer layer over the three hardware timer circuits.
//!
//! Each circuit produces a fixed-period tick interrupt (0.128 ms, set by the
//! circuit's clock prescaler). A [`SoftTimer`] virtualizes that tick into an
//! arbitrary elapse time in whole milliseconds by counting ticks up to a
//! precomputed threshold. Three independently configured software timers can
//! therefore run at once, one per circuit, each firing its own dispatch slot.
//!
//! Circuit ownership follows the same single-owner rule as pins: binding an
//! already-bound circuit fails and leaves the first owner untouched.

use log::debug;

use crate::bus::{HardwareBus, Reg};
use crate::context::HardwareContext;
use crate::dispatch::Callback;
use crate::error::{HalError, Result};

/// Number of physical timer circuits.
pub const NUM_CIRCUITS: usize = 3;

/// Fixed hardware tick period in milliseconds.
///
/// All three circuits are configured for the same tick: 256 counts of the
/// prescaled (clk/8) 16 MHz clock.
pub const TICK_PERIOD_MS: f64 = 0.128;

/// Control bits selecting the clk/8 prescaler on circuits 0 and 2.
const PRESCALE_CTRL_BITS: u8 = 0x02;
/// Control bits selecting CTC mode with the clk/8 prescaler on circuit 1.
const CTC_PRESCALE_CTRL_BITS: u8 = 0x0A;
/// CTC top value giving circuit 1 the shared 0.128 ms tick.
const CTC_COMPARE_TOP: u8 = 0xFF;

/// Tick-interrupt enable bits in the per-circuit mask registers.
const TICK_IRQ_BITS: [u8; NUM_CIRCUITS] = [0x01, 0x02, 0x01];

/// Physical timer circuit selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCircuit {
    /// Timer circuit 0.
    Timer0,
    /// Timer circuit 1.
    Timer1,
    /// Timer circuit 2.
    Timer2,
}

impl TimerCircuit {
    /// Dispatch-table and channel index of the circuit.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            TimerCircuit::Timer0 => 0,
            TimerCircuit::Timer1 => 1,
            TimerCircuit::Timer2 => 2,
        }
    }

    /// Circuit for a raw selector.
    ///
    /// The enumeration is closed, so an out-of-range selector should be
    /// unreachable; this is the defensive boundary for vector wiring that
    /// starts from a raw index.
    pub fn from_index(index: u8) -> Result<TimerCircuit> {
        match index {
            0 => Ok(TimerCircuit::Timer0),
            1 => Ok(TimerCircuit::Timer1),
            2 => Ok(TimerCircuit::Timer2),
            other => Err(HalError::UnknownCircuit(other)),
        }
    }

    fn ctrl_reg(self) -> Reg {
        match self {
            TimerCircuit::Timer0 => Reg::TimerCtrl0,
            TimerCircuit::Timer1 => Reg::TimerCtrl1,
            TimerCircuit::Timer2 => Reg::TimerCtrl2,
        }
    }

    fn mask_reg(self) -> Reg {
        match self {
            TimerCircuit::Timer0 => Reg::TimerMask0,
            TimerCircuit::Timer1 => Reg::TimerMask1,
            TimerCircuit::Timer2 => Reg::TimerMask2,
        }
    }

    fn tick_irq_bit(self) -> u8 {
        TICK_IRQ_BITS[self.index()]
    }
}

/// Number of ticks needed to span `elapse_ms` milliseconds.
///
/// Zero elapse time maps to a zero threshold, which keeps the timer in the
/// stopped state (a free-running threshold of zero would fire on every tick).
fn ticks_for_ms(elapse_ms: u16) -> u32 {
    if elapse_ms == 0 {
        return 0;
    }
    (f64::from(elapse_ms) / TICK_PERIOD_MS).round() as u32
}

/// A software timer bound to one hardware timer circuit.
pub struct SoftTimer<'a, B: HardwareBus> {
    ctx: &'a HardwareContext<B>,
    circuit: TimerCircuit,
}

impl<'a, B: HardwareBus> SoftTimer<'a, B> {
    /// Binds `circuit` and configures it for `elapse_ms` milliseconds.
    ///
    /// Fails with [`HalError::CircuitReserved`] if the circuit is already
    /// bound to another live timer; the failed call leaves the first owner's
    /// configuration and running counter untouched. `elapse_ms == 0` forces
    /// the stopped state. The timer starts immediately when `autostart` is
    /// set.
    pub fn init(
        ctx: &'a HardwareContext<B>,
        circuit: TimerCircuit,
        elapse_ms: u16,
        autostart: bool,
    ) -> Result<Self> {
        if !ctx.circuits.try_claim(circuit.index() as u8) {
            return Err(HalError::CircuitReserved(circuit));
        }

        match circuit {
            TimerCircuit::Timer0 | TimerCircuit::Timer2 => {
                ctx.bus.store(circuit.ctrl_reg(), PRESCALE_CTRL_BITS);
            }
            TimerCircuit::Timer1 => {
                ctx.bus.store(circuit.ctrl_reg(), CTC_PRESCALE_CTRL_BITS);
                ctx.bus.store(Reg::TimerCompare1, CTC_COMPARE_TOP);
            }
        }

        let timer = Self { ctx, circuit };
        timer.set_elapse_time_ms(elapse_ms);
        if autostart {
            timer.start();
        }
        debug!(
            "[TIMER] {:?} bound, elapse {} ms ({} ticks)",
            circuit,
            elapse_ms,
            timer.channel().threshold()
        );
        Ok(timer)
    }

    fn channel(&self) -> &crate::context::TimerChannel {
        &self.ctx.channels[self.circuit.index()]
    }

    /// The circuit this timer is bound to.
    pub fn circuit(&self) -> TimerCircuit {
        self.circuit
    }

    /// True if the timer is currently counting ticks.
    pub fn is_enabled(&self) -> bool {
        self.channel().is_enabled()
    }

    /// Starts or stops the timer.
    pub fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Reconfigures the elapse time. Zero stops the timer.
    pub fn set_elapse_time_ms(&self, elapse_ms: u16) {
        if elapse_ms == 0 {
            self.stop();
        }
        self.channel().set_threshold(ticks_for_ms(elapse_ms));
    }

    /// The configured elapse time in milliseconds, quantized to the tick
    /// period.
    pub fn elapse_time_ms(&self) -> u32 {
        (f64::from(self.channel().threshold()) * TICK_PERIOD_MS) as u32
    }

    /// Enables the circuit's tick interrupt and starts counting.
    ///
    /// No-op while the elapse threshold is zero.
    pub fn start(&self) {
        self.ctx.bus.irq_enable();
        if self.channel().threshold() > 0 {
            self.ctx
                .bus
                .set_bits(self.circuit.mask_reg(), self.circuit.tick_irq_bit());
            self.channel().set_enabled(true);
        }
    }

    /// Disables the circuit's tick interrupt and stops counting.
    ///
    /// A callback already executing is not aborted; stopping only prevents
    /// future dispatch.
    pub fn stop(&self) {
        self.ctx
            .bus
            .clear_bits(self.circuit.mask_reg(), self.circuit.tick_irq_bit());
        self.channel().set_enabled(false);
    }

    /// Flips between started and stopped.
    pub fn toggle_enabled(&self) {
        self.set_enabled(!self.is_enabled());
    }

    /// Zeroes the tick counter and starts.
    pub fn restart(&self) {
        self.channel().reset_counter();
        self.start();
    }

    /// Bumps the tick counter, as the tick trampoline does.
    ///
    /// Counts only while enabled; returns true if the counter was
    /// incremented.
    pub fn increment(&self) -> bool {
        self.channel().increment()
    }

    /// True once the counted ticks reach the threshold. The counter resets
    /// to zero on a true return, so the timer repeats indefinitely.
    pub fn has_elapsed(&self) -> bool {
        self.channel().has_elapsed()
    }

    /// Registers `callback` in the dispatch slot of this timer's circuit.
    /// An existing registration is overwritten.
    pub fn add_callback(&self, callback: Callback) -> Result<()> {
        self.ctx.timer_callbacks.add(callback, self.circuit.index())
    }

    /// Clears the dispatch slot of this timer's circuit.
    pub fn remove_callback(&self) -> Result<()> {
        self.ctx.timer_callbacks.remove(self.circuit.index())
    }
}

impl<B: HardwareBus> Drop for SoftTimer<'_, B> {
    /// Unbinds the circuit: stops the timer, zeroes the hardware control
    /// state and releases the binding so the circuit can be rebound.
    fn drop(&mut self) {
        self.stop();
        self.ctx.bus.store(self.circuit.ctrl_reg(), 0x00);
        if self.circuit == TimerCircuit::Timer1 {
            self.ctx.bus.store(Reg::TimerCompare1, 0x00);
        }
        self.ctx.bus.store(self.circuit.mask_reg(), 0x00);
        self.channel().reset_counter();
        self.channel().set_threshold(0);
        self.ctx.circuits.release(self.circuit.index() as u8);
        debug!("[TIMER] {:?} unbound", self.circuit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimBus;
    use crate::context::HardwareContext;
    use core::sync::atomic::{AtomicU32, Ordering};

    fn ctx() -> HardwareContext<SimBus> {
        HardwareContext::new(SimBus::new())
    }

    #[test]
    fn test_ticks_for_ms_rounds_to_nearest() {
        assert_eq!(ticks_for_ms(0), 0);
        assert_eq!(ticks_for_ms(1), 8); // 7.8125 rounds up
        assert_eq!(ticks_for_ms(100), 781); // 781.25 rounds down
        assert_eq!(ticks_for_ms(300), 2344);
    }

    #[test]
    fn test_double_bind_fails_and_keeps_first_binding() {
        let ctx = ctx();
        let first = SoftTimer::init(&ctx, TimerCircuit::Timer0, 100, true).unwrap();
        first.increment();
        assert_eq!(
            SoftTimer::init(&ctx, TimerCircuit::Timer0, 5, false).err(),
            Some(HalError::CircuitReserved(TimerCircuit::Timer0))
        );
        // Winner still enabled with its own threshold and running counter.
        assert!(first.is_enabled());
        assert_eq!(first.elapse_time_ms(), 99); // 781 ticks * 0.128 ms
    }

    #[test]
    fn test_rebind_after_drop() {
        let ctx = ctx();
        {
            let _timer = SoftTimer::init(&ctx, TimerCircuit::Timer2, 10, true).unwrap();
            assert!(ctx.bus().read_any(Reg::TimerMask2, 0x01));
        }
        // Drop zeroed the hardware control state and released the circuit.
        assert_eq!(ctx.bus().load(Reg::TimerCtrl2), 0);
        assert_eq!(ctx.bus().load(Reg::TimerMask2), 0);
        let _again = SoftTimer::init(&ctx, TimerCircuit::Timer2, 10, false).unwrap();
    }

    #[test]
    fn test_periodic_elapse_cycle() {
        let ctx = ctx();
        let timer = SoftTimer::init(&ctx, TimerCircuit::Timer1, 1, true).unwrap();
        // 1 ms at the 0.128 ms tick is 8 ticks; the cycle repeats.
        for _cycle in 0..3 {
            for _ in 0..7 {
                assert!(timer.increment());
                assert!(!timer.has_elapsed());
            }
            assert!(timer.increment());
            assert!(timer.has_elapsed());
            assert!(!timer.has_elapsed()); // counter self-reset
        }
    }

    #[test]
    fn test_zero_elapse_forces_stopped_state() {
        let ctx = ctx();
        let timer = SoftTimer::init(&ctx, TimerCircuit::Timer0, 0, true).unwrap();
        // Autostart must not arm a free-running always-firing timer.
        assert!(!timer.is_enabled());
        timer.start();
        assert!(!timer.is_enabled());
        assert!(!timer.increment());
    }

    #[test]
    fn test_zero_reconfigure_stops_running_timer() {
        let ctx = ctx();
        let timer = SoftTimer::init(&ctx, TimerCircuit::Timer0, 10, true).unwrap();
        assert!(timer.is_enabled());
        timer.set_elapse_time_ms(0);
        assert!(!timer.is_enabled());
    }

    #[test]
    fn test_stop_toggle_restart() {
        let ctx = ctx();
        let timer = SoftTimer::init(&ctx, TimerCircuit::Timer1, 1, true).unwrap();
        timer.stop();
        assert!(!timer.is_enabled());
        assert!(!timer.increment());
        timer.toggle_enabled();
        assert!(timer.is_enabled());

        // Partial progress, then restart zeroes the counter.
        for _ in 0..5 {
            timer.increment();
        }
        timer.restart();
        for _ in 0..7 {
            timer.increment();
            assert!(!timer.has_elapsed());
        }
        timer.increment();
        assert!(timer.has_elapsed());
    }

    #[test]
    fn test_tick_trampoline_fires_dispatch_slot() {
        static FIRES: AtomicU32 = AtomicU32::new(0);
        fn on_elapse() {
            FIRES.fetch_add(1, Ordering::Relaxed);
        }

        let ctx = ctx();
        let timer = SoftTimer::init(&ctx, TimerCircuit::Timer0, 1, true).unwrap();
        timer.add_callback(on_elapse).unwrap();

        let before = FIRES.load(Ordering::Relaxed);
        for _ in 0..8 {
            ctx.isr_timer_tick(TimerCircuit::Timer0);
        }
        assert_eq!(FIRES.load(Ordering::Relaxed), before + 1);
        for _ in 0..8 {
            ctx.isr_timer_tick(TimerCircuit::Timer0);
        }
        assert_eq!(FIRES.load(Ordering::Relaxed), before + 2);
    }

    #[test]
    fn test_from_index_defensive_path() {
        assert_eq!(TimerCircuit::from_index(1), Ok(TimerCircuit::Timer1));
        assert_eq!(
            TimerCircuit::from_index(3),
            Err(HalError::UnknownCircuit(3))
        );
    }

    #[test]
    fn test_circuit_1_uses_ctc_configuration() {
        let ctx = ctx();
        let _timer = SoftTimer::init(&ctx, TimerCircuit::Timer1, 10, false).unwrap();
        assert_eq!(ctx.bus().load(Reg::TimerCtrl1), CTC_PRESCALE_CTRL_BITS);
        assert_eq!(ctx.bus().load(Reg::TimerCompare1), CTC_COMPARE_TOP);
    }
}
