//! Panic contract test for an unbalanced new-task resume.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(piko_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use piko_kernel::arch::qemu::{exit_qemu, QemuExitCode};
use piko_kernel::scheduler as sched;

#[no_mangle]
#[link_section = ".text.boot"]
pub extern "C" fn KernelMain() -> ! {
    piko_kernel::drivers::uart::init();
    piko_kernel::memory::heap::init();

    test_main();

    // If this is reached, the expected panic did not happen.
    exit_qemu(QemuExitCode::Failed);
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    let expected = "unbalanced resume_new_tasks";
    let matches_contract = info
        .message()
        .as_str()
        .is_some_and(|m| m.contains(expected));

    if matches_contract {
        exit_qemu(QemuExitCode::Success);
    } else {
        exit_qemu(QemuExitCode::Failed);
    }
}

/// Contract: resume_new_tasks without a matching suspend is fatal.
/// Given: A freshly initialized scheduler with a zero suspend counter.
/// When: resume_new_tasks is called once.
/// Then: The call must panic with the documented contract message.
#[test_case]
fn test_resume_without_suspend_panics() {
    sched::init();
    sched::resume_new_tasks();
}
