// Copyright 2025 the m328-hal authors.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end interrupt scenarios against the simulated register bus.
//!
//! Dispatch callbacks are plain `fn()` pointers (one hardware vector per
//! unit, no closure environment), so each scenario wires its devices through
//! process-wide statics, exactly as application entry code does on target.
//! Interrupts are simulated by invoking the context trampolines; the test
//! body plays the role of the hardware, checking the port gate before
//! delivering a pin-change vector.

use core::sync::atomic::{AtomicU32, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use m328_hal::prelude::*;

const BUTTON_PIN: u8 = 13; // port B, bit 5
const LED_PIN: u8 = 9; // port B, bit 1

const BUTTON_MASK: u8 = 1 << 5;
const LED_MASK: u8 = 1 << 1;

// ---------------------------------------------------------------------------
// Scenario 1: shared port callback toggles an LED on button edges
// ---------------------------------------------------------------------------

static EDGE_CTX: Lazy<HardwareContext<SimBus>> = Lazy::new(|| HardwareContext::new(SimBus::new()));
static EDGE_BUTTON: Lazy<Mutex<GpioLine<'static, SimBus>>> = Lazy::new(|| {
    Mutex::new(GpioLine::init(&EDGE_CTX, BUTTON_PIN, Direction::InputPullup).unwrap())
});
static EDGE_LED: Lazy<Mutex<GpioLine<'static, SimBus>>> =
    Lazy::new(|| Mutex::new(GpioLine::init(&EDGE_CTX, LED_PIN, Direction::Output).unwrap()));
static EDGE_CALLS: AtomicU32 = AtomicU32::new(0);

// One vector serves the whole port: the callback re-reads the button to
// decide whether the event was the falling edge it cares about.
fn edge_callback() {
    EDGE_CALLS.fetch_add(1, Ordering::Relaxed);
    if !EDGE_BUTTON.lock().read() {
        EDGE_LED.lock().toggle();
    }
}

#[test]
fn three_falling_edges_leave_led_inverted() {
    let bus = EDGE_CTX.bus();
    let initial = {
        let button = EDGE_BUTTON.lock();
        let led = EDGE_LED.lock();
        button.add_callback(edge_callback).unwrap();
        button.enable_interrupt();
        led.read(); // force init order
        bus.read_any(Reg::OutB, LED_MASK)
    };

    // Idle level for a pull-up input is high.
    bus.drive_input(Reg::InB, BUTTON_MASK, true);

    for _ in 0..3 {
        // Falling edge, vector fires.
        bus.drive_input(Reg::InB, BUTTON_MASK, false);
        EDGE_CTX.isr_pin_change(IoPort::B);
        // Rising edge, vector fires again; the callback reads the line
        // and leaves the LED alone.
        bus.drive_input(Reg::InB, BUTTON_MASK, true);
        EDGE_CTX.isr_pin_change(IoPort::B);
    }

    // Exactly one invocation per delivered event, and an odd number of
    // toggles inverts the output.
    assert_eq!(EDGE_CALLS.load(Ordering::Relaxed), 6);
    assert_eq!(bus.read_any(Reg::OutB, LED_MASK), !initial);
}

// ---------------------------------------------------------------------------
// Scenario 2: debounced button gating a blink timer, watchdog serviced
// ---------------------------------------------------------------------------

const DEBOUNCE_MS: u16 = 300;
const BLINK_MS: u16 = 100;
const DEBOUNCE_TICKS: u32 = 2344; // round(300 / 0.128)
const BLINK_TICKS: u32 = 781; // round(100 / 0.128)

static DEB_CTX: Lazy<HardwareContext<SimBus>> = Lazy::new(|| HardwareContext::new(SimBus::new()));
static DEB_BUTTON: Lazy<Mutex<GpioLine<'static, SimBus>>> = Lazy::new(|| {
    Mutex::new(GpioLine::init(&DEB_CTX, BUTTON_PIN, Direction::InputPullup).unwrap())
});
static DEB_LED: Lazy<Mutex<GpioLine<'static, SimBus>>> =
    Lazy::new(|| Mutex::new(GpioLine::init(&DEB_CTX, LED_PIN, Direction::Output).unwrap()));
static DEBOUNCE_TIMER: Lazy<Mutex<SoftTimer<'static, SimBus>>> = Lazy::new(|| {
    Mutex::new(SoftTimer::init(&DEB_CTX, TimerCircuit::Timer0, DEBOUNCE_MS, false).unwrap())
});
static BLINK_TIMER: Lazy<Mutex<SoftTimer<'static, SimBus>>> = Lazy::new(|| {
    Mutex::new(SoftTimer::init(&DEB_CTX, TimerCircuit::Timer1, BLINK_MS, false).unwrap())
});

// Pressing the button toggles blinking; the port gate closes for the
// debounce window so contact bounce cannot re-trigger the vector.
fn debounced_button_callback() {
    let button = DEB_BUTTON.lock();
    button.disable_port_interrupts();
    DEBOUNCE_TIMER.lock().start();

    if !button.read() {
        let blink = BLINK_TIMER.lock();
        blink.toggle_enabled();
        if !blink.is_enabled() {
            DEB_LED.lock().clear();
        }
    }
}

// Reopens the port gate once the debounce window has passed.
fn debounce_elapsed_callback() {
    DEBOUNCE_TIMER.lock().stop();
    DEB_BUTTON.lock().enable_port_interrupts();
}

fn blink_elapsed_callback() {
    DEB_LED.lock().toggle();
}

/// Delivers a pin-change event the way the hardware would: only if the
/// port-level gate and the pin's mask bit are both open.
fn deliver_button_edge(level: bool) -> bool {
    let bus = DEB_CTX.bus();
    bus.drive_input(Reg::InB, BUTTON_MASK, level);
    let deliverable = bus.read_any(Reg::PortIrqCtrl, IoPort::B.irq_ctrl_bit())
        && bus.read_any(Reg::PinMaskB, BUTTON_MASK);
    if deliverable {
        DEB_CTX.isr_pin_change(IoPort::B);
    }
    deliverable
}

#[test]
fn debounce_window_suppresses_bounce_and_blink_runs() {
    let bus = DEB_CTX.bus();
    {
        let button = DEB_BUTTON.lock();
        button.add_callback(debounced_button_callback).unwrap();
        DEBOUNCE_TIMER
            .lock()
            .add_callback(debounce_elapsed_callback)
            .unwrap();
        BLINK_TIMER.lock().add_callback(blink_elapsed_callback).unwrap();
        button.enable_interrupt();
    }
    let wdt = DEB_CTX.watchdog();
    wdt.init(Timeout::Ms1024);
    wdt.enable_system_reset();

    bus.drive_input(Reg::InB, BUTTON_MASK, true);

    // Press: the falling edge is delivered and closes the port gate.
    assert!(deliver_button_edge(false));
    assert!(BLINK_TIMER.lock().is_enabled());
    assert!(DEBOUNCE_TIMER.lock().is_enabled());

    // Contact bounce inside the window: the gate is closed, nothing fires.
    assert!(!deliver_button_edge(true));
    assert!(!deliver_button_edge(false));
    assert!(BLINK_TIMER.lock().is_enabled());

    // The debounce window elapses; the gate reopens.
    for _ in 0..DEBOUNCE_TICKS {
        wdt.reset();
        DEB_CTX.isr_timer_tick(TimerCircuit::Timer0);
    }
    assert!(!DEBOUNCE_TIMER.lock().is_enabled());
    assert!(bus.read_any(Reg::PortIrqCtrl, IoPort::B.irq_ctrl_bit()));

    // Two blink periods: the LED toggles twice and ends where it started.
    let led_before = bus.read_any(Reg::OutB, LED_MASK);
    for _ in 0..BLINK_TICKS {
        DEB_CTX.isr_timer_tick(TimerCircuit::Timer1);
    }
    assert_eq!(bus.read_any(Reg::OutB, LED_MASK), !led_before);
    for _ in 0..BLINK_TICKS {
        DEB_CTX.isr_timer_tick(TimerCircuit::Timer1);
    }
    assert_eq!(bus.read_any(Reg::OutB, LED_MASK), led_before);

    // Release, then a second press stops the blinking and clears the LED.
    assert!(deliver_button_edge(true));
    for _ in 0..DEBOUNCE_TICKS {
        DEB_CTX.isr_timer_tick(TimerCircuit::Timer0);
    }
    assert!(deliver_button_edge(false));
    assert!(!BLINK_TIMER.lock().is_enabled());
    assert!(!bus.read_any(Reg::OutB, LED_MASK));

    // The main loop serviced the watchdog throughout.
    assert!(bus.kick_count() > 0);
}
