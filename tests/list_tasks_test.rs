//! Task-listing diagnostics integration tests.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(piko_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use alloc::string::String;
use core::panic::PanicInfo;

use piko_kernel::scheduler::{self as sched};
use piko_kernel::sync::waitlist::WaitList;

#[no_mangle]
#[link_section = ".text.boot"]
pub extern "C" fn KernelMain() -> ! {
    piko_kernel::drivers::uart::init();
    piko_kernel::memory::heap::init();

    test_main();

    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    piko_kernel::testing::test_panic_handler(info)
}

extern "C" fn dummy_task() {
    loop {
        core::hint::spin_loop();
    }
}

#[test_case]
fn test_listing_starts_with_the_diagnostic_header() {
    sched::init();

    let mut out = String::new();
    sched::list_tasks(&mut out);

    let mut lines = out.lines();
    assert!(
        lines.next() == Some("#  ADDR     STAT  FL NAME"),
        "listing must start with the fixed header"
    );
}

#[test_case]
fn test_listing_marks_current_task_as_running() {
    sched::init();

    let mut out = String::new();
    sched::list_tasks(&mut out);

    let main_row = out
        .lines()
        .find(|line| line.ends_with("Main"))
        .expect("Main row must be listed");
    assert!(
        main_row.contains("run"),
        "the current task must be shown as run, not by its raw state"
    );
    assert!(main_row.starts_with("00"), "Main must be listed in slot 0");
}

#[test_case]
fn test_listing_shows_state_mnemonics_and_suspend_flag() {
    sched::init();

    let sleeper = sched::spawn("sleeper", dummy_task).expect("sleeper should spawn");
    let parked = sched::spawn("parked", dummy_task).expect("parked should spawn");

    sched::set_task_sleeping(sleeper, 1_000_000);
    sched::suspend_task(parked);

    let mut out = String::new();
    sched::list_tasks(&mut out);

    let sleeper_row = out
        .lines()
        .find(|line| line.ends_with("sleeper"))
        .expect("sleeper row must be listed");
    assert!(sleeper_row.contains("sleep"), "sleeping state mnemonic missing");

    let parked_row = out
        .lines()
        .find(|line| line.ends_with("parked"))
        .expect("parked row must be listed");
    assert!(
        parked_row.contains("S "),
        "suspended tasks must carry the S flag"
    );
}

#[test_case]
fn test_listing_flags_timed_blockers() {
    sched::init();

    static LIST: WaitList = WaitList::new();

    let _ = sched::block_on_with(&LIST, 1_000_000, || {
        let mut out = String::new();
        sched::list_tasks(&mut out);

        let main_row = out
            .lines()
            .find(|line| line.ends_with("Main"))
            .expect("Main row must be listed");
        assert!(
            main_row.contains("run"),
            "the blocked current task still lists as run"
        );
        assert!(
            main_row.contains(" T "),
            "a timed blocker must carry the T flag"
        );

        sched::wake_all(&LIST);
    });
}
