// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # m328-hal
//!
//! Hardware-abstraction core for ATmega328-class microcontrollers:
//!
//! - **Register access** (`bus`, `bitops`) - typed bitmask operations on the
//!   device's registers behind a [`HardwareBus`] trait with a real
//!   memory-mapped implementation and an in-memory simulator.
//! - **Pin ownership** (`registry`) - one bit per logical pin; at most one
//!   live [`GpioLine`] per pin, at most one [`SoftTimer`] per circuit.
//! - **Interrupt dispatch** (`dispatch`, `context`) - fixed-capacity callback
//!   tables, one slot per hardware unit, fired synchronously from per-vector
//!   trampolines on the [`HardwareContext`].
//! - **Software timers** (`timer`) - the fixed 0.128 ms hardware tick
//!   virtualized into arbitrary millisecond elapse times, three independent
//!   timers on three physical circuits.
//! - **Watchdog supervision** (`watchdog`) - deadman switch with
//!   reset-on-timeout and one-shot interrupt notification (re-armed by the
//!   trampoline).
//!
//! ## Usage
//!
//! ```
//! use m328_hal::prelude::*;
//!
//! let ctx = HardwareContext::new(SimBus::new());
//! let led = GpioLine::init(&ctx, 9, Direction::Output)?;
//! let blink = SoftTimer::init(&ctx, TimerCircuit::Timer1, 100, true)?;
//!
//! led.set();
//! ctx.watchdog().init(Timeout::Ms1024);
//! ctx.watchdog().enable_system_reset();
//!
//! // Hardware (or a test) drives the trampolines; the main loop's only
//! // mandatory duty is servicing the watchdog.
//! ctx.watchdog().reset();
//! # drop(blink);
//! # Ok::<(), m328_hal::HalError>(())
//! ```
//!
//! The execution model is a single hardware thread preempted by
//! non-nesting interrupts. Multi-step register sequences that must appear
//! atomic to an interrupt run inside [`HardwareBus::critical`]; everything
//! else is a single read-modify-write.

pub mod bitops;
pub mod bus;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gpio;
pub mod registry;
pub mod timer;
pub mod watchdog;

pub use bus::{HardwareBus, MmioBus, Reg, SimBus};
pub use context::HardwareContext;
pub use dispatch::{Callback, CallbackTable};
pub use error::{HalError, Result};
pub use gpio::{Direction, GpioLine, IoPort};
pub use registry::ClaimRegistry;
pub use timer::{SoftTimer, TimerCircuit, TICK_PERIOD_MS};
pub use watchdog::{Timeout, WatchdogSupervisor};

/// Prelude module for convenient imports
///
/// ```
/// use m328_hal::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bus::{HardwareBus, MmioBus, Reg, SimBus};
    pub use crate::context::HardwareContext;
    pub use crate::dispatch::Callback;
    pub use crate::error::{HalError, Result};
    pub use crate::gpio::{Direction, GpioLine, IoPort};
    pub use crate::timer::{SoftTimer, TimerCircuit};
    pub use crate::watchdog::{Timeout, WatchdogSupervisor};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version
pub fn version() -> &'static str {
    VERSION
}
