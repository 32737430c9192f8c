//! Panic contract test for task-table capacity exhaustion.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(piko_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use piko_kernel::arch::qemu::{exit_qemu, QemuExitCode};
use piko_kernel::scheduler::{self as sched, MAX_TASKS};

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
    let expected = "system limit of tasks exceeded";
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

extern "C" fn dummy_task() {
    loop {
        core::hint::spin_loop();
    }
}

/// Contract: registering a task beyond MAX_TASKS is fatal.
/// Given: A full task table (Main plus MAX_TASKS - 1 spawned tasks).
/// When: One more task is registered.
/// Then: The call must panic with the documented contract message.
#[test_case]
fn test_add_task_beyond_capacity_panics() {
    sched::init();

    for _ in 1..MAX_TASKS {
        sched::spawn("filler", dummy_task).expect("spawn within capacity should succeed");
    }

    let _ = sched::spawn("one-too-many", dummy_task);
}
