//! Piko Rust Kernel - Main Entry Point
//!
//! This is the kernel entry point called by the boot glue after it has set
//! up the ARM exception vectors, switched to System mode, and established
//! the boot stack. The context `KernelMain` runs in becomes the scheduler's
//! "Main" task.

#![no_std]
#![no_main]

extern crate alloc;

mod arch;
mod drivers;
mod logging;
mod memory;
mod panic;
mod scheduler;
mod sync;
mod syscall;

use arch::interrupts;
use drivers::timer;
use drivers::uart;

/// Seconds the Main task idles between task-table dumps.
const TASK_LIST_PERIOD_SECONDS: u32 = 5;

/// Kernel entry point - called from the boot glue
///
/// # Safety
/// This function is called exactly once from assembly, with exception
/// vectors installed and a valid stack.
#[no_mangle]
#[link_section = ".text.boot"]
pub extern "C" fn KernelMain() -> ! {
    // Initialize debug UART output first for early debugging
    uart::init();
    debugln!("piko kernel starting...");

    // Initialize the kernel heap (TCBs and task stacks live there)
    memory::heap::init();
    debugln!("Heap initialized");

    // Mask and clear all interrupt lines before any device arms one
    interrupts::init();
    debugln!("Interrupt controller initialized");

    // Start the system timer: monotonic clock + periodic tick
    timer::init();
    debugln!("System timer initialized at {} Hz tick rate", timer::HZ);

    // Install the scheduler; this context becomes the Main task.
    scheduler::init();
    debugln!("Scheduler initialized, Main task running");

    // Spawn the demo task set and switch on preemptive multitasking.
    scheduler::demotasks::start_demo();
    debugln!("Demo tasks spawned, preemption enabled");

    // Main task loop: periodically dump the task table to the UART.
    let mut sink = uart::Uart::new();
    loop {
        scheduler::sleep(TASK_LIST_PERIOD_SECONDS);
        scheduler::list_tasks(&mut sink);
    }
}
