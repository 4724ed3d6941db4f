// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! GPIO line driver.
//!
//! A [`GpioLine`] binds one logical pin (0-19) to its physical 8-bit port,
//! manages direction and level, and wires pin-change interrupt handling.
//! Pin ownership is arbitrated through the context's claim registry: at most
//! one live line per pin.
//!
//! Callbacks are registered per **port**, not per pin - the hardware issues
//! one pin-change vector per port, so all pins of a port share one dispatch
//! slot and the callback body re-reads line states to find the pin that
//! changed.

use log::debug;

use crate::bitops;
use crate::bus::{HardwareBus, Reg};
use crate::context::HardwareContext;
use crate::dispatch::Callback;
use crate::error::{HalError, Result};

/// Number of logical pins.
pub const NUM_PINS: u8 = 20;

/// Number of physical I/O ports.
pub const NUM_PORTS: usize = 3;

const PIN_MAX: u8 = NUM_PINS - 1;

/// Direction of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input without the internal pull-up (tri-state).
    Input,
    /// Input with the internal pull-up resistor enabled.
    InputPullup,
    /// Output.
    Output,
}

/// Physical 8-bit I/O port.
///
/// Logical pins map as 0-7 to port A, 8-13 to port B and 14-19 to port C;
/// the remaining lines of ports B and C are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPort {
    /// Port A, pins 0-7.
    A,
    /// Port B, pins 8-13.
    B,
    /// Port C, pins 14-19.
    C,
}

impl IoPort {
    /// Dispatch-table and control-bit index of the port.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            IoPort::A => 0,
            IoPort::B => 1,
            IoPort::C => 2,
        }
    }

    /// The port's bit in the port-interrupt control register.
    #[inline]
    pub fn irq_ctrl_bit(self) -> u8 {
        bitops::bit(self.index() as u8)
    }

    /// Lowest logical pin number belonging to the port.
    fn base(self) -> u8 {
        match self {
            IoPort::A => 0,
            IoPort::B => 8,
            IoPort::C => 14,
        }
    }

    /// The port a valid logical pin is connected to.
    fn for_pin(pin: u8) -> IoPort {
        match pin {
            0..=7 => IoPort::A,
            8..=13 => IoPort::B,
            _ => IoPort::C,
        }
    }

    fn dir_reg(self) -> Reg {
        match self {
            IoPort::A => Reg::DirA,
            IoPort::B => Reg::DirB,
            IoPort::C => Reg::DirC,
        }
    }

    fn out_reg(self) -> Reg {
        match self {
            IoPort::A => Reg::OutA,
            IoPort::B => Reg::OutB,
            IoPort::C => Reg::OutC,
        }
    }

    fn in_reg(self) -> Reg {
        match self {
            IoPort::A => Reg::InA,
            IoPort::B => Reg::InB,
            IoPort::C => Reg::InC,
        }
    }

    fn mask_reg(self) -> Reg {
        match self {
            IoPort::A => Reg::PinMaskA,
            IoPort::B => Reg::PinMaskB,
            IoPort::C => Reg::PinMaskC,
        }
    }
}

/// A claimed GPIO line.
///
/// Releasing happens through [`GpioLine::disable`] or `Drop`, restoring the
/// ownership bit and clearing the line's hardware state.
pub struct GpioLine<'a, B: HardwareBus> {
    ctx: &'a HardwareContext<B>,
    pin: u8,
    port: IoPort,
    mask: u8,
    bound: bool,
}

impl<'a, B: HardwareBus> GpioLine<'a, B> {
    /// Claims `pin` and configures its direction.
    ///
    /// Fails if the pin is out of range or already claimed by a live line;
    /// a failed call mutates nothing.
    ///
    /// `Input` writes no register (the line is tri-state by default);
    /// `InputPullup` sets the output bit while direction stays input, which
    /// enables the internal pull-up; `Output` sets the direction bit.
    pub fn init(ctx: &'a HardwareContext<B>, pin: u8, direction: Direction) -> Result<Self> {
        if pin > PIN_MAX {
            return Err(HalError::PinOutOfRange(pin));
        }
        if !ctx.pins.try_claim(pin) {
            return Err(HalError::PinReserved(pin));
        }

        let port = IoPort::for_pin(pin);
        let mask: u8 = bitops::bit(pin - port.base());
        match direction {
            Direction::Input => {}
            Direction::InputPullup => ctx.bus.set_bits(port.out_reg(), mask),
            Direction::Output => ctx.bus.set_bits(port.dir_reg(), mask),
        }
        debug!("[GPIO] pin {} claimed on port {:?} as {:?}", pin, port, direction);

        Ok(Self {
            ctx,
            pin,
            port,
            mask,
            bound: true,
        })
    }

    /// The logical pin number of the line.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// The I/O port the line is connected to.
    pub fn io_port(&self) -> IoPort {
        self.port
    }

    /// Releases the line: clears output and direction bits, removes the
    /// pin's interrupt-mask contribution and frees the ownership bit.
    ///
    /// Idempotent - a second call is a no-op.
    pub fn disable(&mut self) {
        if !self.bound {
            return;
        }
        self.ctx.bus.clear_bits(self.port.dir_reg(), self.mask);
        self.ctx.bus.clear_bits(self.port.out_reg(), self.mask);
        self.disable_interrupt();
        self.ctx.pins.release(self.pin);
        self.bound = false;
        debug!("[GPIO] pin {} released", self.pin);
    }

    fn is_output(&self) -> bool {
        self.ctx.bus.read_any(self.port.dir_reg(), self.mask)
    }

    /// Drives the line high. Silent no-op unless direction is `Output`.
    pub fn set(&self) {
        if self.is_output() {
            self.ctx.bus.set_bits(self.port.out_reg(), self.mask);
        }
    }

    /// Drives the line low. Silent no-op unless direction is `Output`.
    pub fn clear(&self) {
        if self.is_output() {
            self.ctx.bus.clear_bits(self.port.out_reg(), self.mask);
        }
    }

    /// Inverts the line's output. Silent no-op unless direction is `Output`.
    pub fn toggle(&self) {
        if self.is_output() {
            self.ctx.bus.toggle_bits(self.port.out_reg(), self.mask);
        }
    }

    /// Drives the line to `high`. Silent no-op unless direction is `Output`.
    pub fn write(&self, high: bool) {
        if high {
            self.set();
        } else {
            self.clear();
        }
    }

    /// Reads the input register bit, regardless of direction.
    pub fn read(&self) -> bool {
        self.ctx.bus.read_any(self.port.in_reg(), self.mask)
    }

    /// Enables the pin-change interrupt contribution of this line: sets the
    /// pin's bit in the port's interrupt mask, the port-level control bit
    /// and the global interrupt flag.
    ///
    /// Independent of whether a callback is registered for the port.
    pub fn enable_interrupt(&self) {
        self.ctx.bus.irq_enable();
        self.ctx.bus.set_bits(Reg::PortIrqCtrl, self.port.irq_ctrl_bit());
        self.ctx.bus.set_bits(self.port.mask_reg(), self.mask);
    }

    /// Removes this line's pin from the port's interrupt mask.
    pub fn disable_interrupt(&self) {
        self.ctx.bus.clear_bits(self.port.mask_reg(), self.mask);
    }

    /// True if the pin's interrupt-mask bit is set.
    pub fn is_interrupt_enabled(&self) -> bool {
        self.ctx.bus.read_any(self.port.mask_reg(), self.mask)
    }

    /// Flips the pin's interrupt-mask contribution.
    pub fn toggle_interrupt(&self) {
        if self.is_interrupt_enabled() {
            self.disable_interrupt();
        } else {
            self.enable_interrupt();
        }
    }

    /// Reopens pin-change interrupts for this line's whole port.
    ///
    /// Coarse gate over all pins of the port, used together with
    /// [`GpioLine::disable_port_interrupts`] to implement a debounce window.
    pub fn enable_port_interrupts(&self) {
        self.ctx.enable_port_interrupts(self.port);
    }

    /// Closes pin-change interrupts for this line's whole port, regardless
    /// of individual pin masks.
    pub fn disable_port_interrupts(&self) {
        self.ctx.disable_port_interrupts(self.port);
    }

    /// Registers `callback` in the dispatch slot of this line's **port**.
    ///
    /// One hardware vector serves all pins of the port, so the callback is
    /// shared: its body must re-read line states to disambiguate which pin
    /// changed. An existing registration for the port is overwritten.
    pub fn add_callback(&self, callback: Callback) -> Result<()> {
        self.ctx.port_callbacks.add(callback, self.port.index())
    }

    /// Clears the dispatch slot of this line's port.
    pub fn remove_callback(&self) -> Result<()> {
        self.ctx.port_callbacks.remove(self.port.index())
    }
}

impl<B: HardwareBus> Drop for GpioLine<'_, B> {
    fn drop(&mut self) {
        self.disable();
    }
}
