//! BCM2835 System Timer Driver
//!
//! The system timer is the kernel's monotonic clock source: a free-running
//! 1 MHz counter (`clock_ticks`) plus a periodic interrupt derived from
//! compare register 3, which maintains the coarse tick (`ticks`) and second
//! (`seconds`) counters and drives the registered periodic handlers.

use core::ptr;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::arch::interrupts::{self, TaskRegisters, IRQ_SYSTEM_TIMER_3};

/// Rate of the free-running system timer counter.
pub const CLOCKHZ: u32 = 1_000_000;

/// Rate of the periodic timer interrupt.
pub const HZ: u32 = 100;

/// System timer register block.
const SYSTEM_TIMER_BASE: usize = 0x2000_3000;

const TIMER_CS: usize = SYSTEM_TIMER_BASE; // Match status (write 1 to clear)
const TIMER_CLO: usize = SYSTEM_TIMER_BASE + 0x04; // Counter low word
const TIMER_C3: usize = SYSTEM_TIMER_BASE + 0x18; // Compare 3

/// CS bit for compare register 3.
const TIMER_CS_MATCH_3: u32 = 1 << 3;

/// Counter increments between two periodic interrupts.
const TICKS_PER_PERIOD: u32 = CLOCKHZ / HZ;

/// Maximum number of registerable periodic handlers.
const MAX_PERIODIC_HANDLERS: usize = 4;

/// Callback invoked once per timer period, in IRQ context.
pub type PeriodicHandler = fn();

/// Periodic ticks since `init` (HZ per second).
static TICKS: AtomicU32 = AtomicU32::new(0);

/// Whole seconds since `init`.
static SECONDS: AtomicU32 = AtomicU32::new(0);

/// Registered periodic handlers.
///
/// Slots are written with IRQs disabled and read from the timer IRQ handler,
/// so no concurrent mutation is possible on this single-core system.
struct PeriodicHandlerTable {
    slots: core::cell::UnsafeCell<[Option<PeriodicHandler>; MAX_PERIODIC_HANDLERS]>,
}

// Safety: see the field invariant above.
unsafe impl Sync for PeriodicHandlerTable {}

static PERIODIC_HANDLERS: PeriodicHandlerTable = PeriodicHandlerTable {
    slots: core::cell::UnsafeCell::new([None; MAX_PERIODIC_HANDLERS]),
};

/// Returns the current value of the free-running 1 MHz counter.
///
/// The counter wraps after about 71 minutes; consumers compare deadlines
/// with signed 32-bit wrapping arithmetic.
pub fn clock_ticks() -> u32 {
    // SAFETY:
    // - Side-effect-free volatile MMIO read of the documented counter register.
    unsafe { ptr::read_volatile(TIMER_CLO as *const u32) }
}

/// Returns the number of periodic ticks since `init`.
pub fn ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

/// Returns the number of whole seconds since `init`.
pub fn seconds() -> u32 {
    SECONDS.load(Ordering::Relaxed)
}

/// Register a handler invoked once per timer period from IRQ context.
///
/// The handler table is small and fixed; exhausting it is a programming
/// error and fatal.
pub fn register_periodic_handler(handler: PeriodicHandler) {
    let were_enabled = interrupts::are_enabled();
    interrupts::disable();

    // SAFETY:
    // - IRQs are disabled, so the timer IRQ cannot observe a torn slot.
    let registered = unsafe {
        let slots = &mut *PERIODIC_HANDLERS.slots.get();
        let free = slots.iter_mut().find(|slot| slot.is_none());
        match free {
            Some(slot) => {
                *slot = Some(handler);
                true
            }
            None => false,
        }
    };

    if were_enabled {
        interrupts::enable();
    }

    if !registered {
        crate::fatal!("timer", "periodic handler table exhausted");
    }
}

/// Timer IRQ handler: acknowledge the match, rearm the compare register,
/// advance the coarse counters, and run the periodic handlers.
fn handle_timer_irq(_irq: u32, _frame: &mut TaskRegisters) {
    // SAFETY:
    // - Writing the match bit back to CS acknowledges the interrupt.
    // - Rearming C3 relative to CLO keeps the period stable; the catch-up
    //   loop skips periods lost to long IRQ-off windows.
    unsafe {
        ptr::write_volatile(TIMER_CS as *mut u32, TIMER_CS_MATCH_3);

        let mut compare = ptr::read_volatile(TIMER_C3 as *const u32);
        let now = ptr::read_volatile(TIMER_CLO as *const u32);
        loop {
            compare = compare.wrapping_add(TICKS_PER_PERIOD);
            if (compare.wrapping_sub(now) as i32) > 0 {
                break;
            }
        }
        ptr::write_volatile(TIMER_C3 as *mut u32, compare);
    }

    let ticks = TICKS.load(Ordering::Relaxed).wrapping_add(1);
    TICKS.store(ticks, Ordering::Relaxed);
    if ticks % HZ == 0 {
        let seconds = SECONDS.load(Ordering::Relaxed).wrapping_add(1);
        SECONDS.store(seconds, Ordering::Relaxed);
    }

    // SAFETY:
    // - Handler slots are only mutated with IRQs disabled.
    let slots = unsafe { &*PERIODIC_HANDLERS.slots.get() };
    for handler in slots.iter().flatten() {
        handler();
    }
}

/// Initialize the periodic timer interrupt at `HZ`.
pub fn init() {
    TICKS.store(0, Ordering::Relaxed);
    SECONDS.store(0, Ordering::Relaxed);

    // SAFETY:
    // - Clearing a stale match and programming the first compare value are
    //   plain volatile MMIO writes to documented registers.
    unsafe {
        ptr::write_volatile(TIMER_CS as *mut u32, TIMER_CS_MATCH_3);
        let now = ptr::read_volatile(TIMER_CLO as *const u32);
        ptr::write_volatile(TIMER_C3 as *mut u32, now.wrapping_add(TICKS_PER_PERIOD));
    }

    interrupts::register_irq_handler(IRQ_SYSTEM_TIMER_3, handle_timer_irq);
}
