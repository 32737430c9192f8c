//! Panic handler for the kernel
//!
//! Required for `no_std` environments. Every fatal path in the kernel ends
//! here: the error has already been logged at Panic level, so this handler
//! only reports the panic location and halts the CPU.

use core::arch::asm;
use core::panic::PanicInfo;

use crate::arch::interrupts;
use crate::debugln;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    interrupts::disable();

    debugln!("!!! KERNEL PANIC !!!");

    if let Some(location) = info.location() {
        debugln!("Location: {}:{}", location.file(), location.line());
    }

    debugln!("Message: {}", info.message());

    // Halt the CPU
    loop {
        // SAFETY:
        // - Panic path intentionally stops all forward progress.
        // - IRQs are masked; `wfi` parks the core in low power.
        unsafe {
            asm!("wfi", options(nomem, nostack, preserves_flags));
        }
    }
}
