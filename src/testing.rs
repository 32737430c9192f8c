//! Bare-metal test harness for the scheduler kernel.
//!
//! Tests run inside QEMU; results go out over the UART and the run ends
//! through the semihosting exit device. Because almost every failure in
//! this kernel comes down to task-table state, the panic path dumps the
//! scheduler's task listing alongside the usual location/message report
//! (unless the panicking context was holding the scheduler lock, in which
//! case the table is unreachable and the dump is skipped).
//!
//! Each integration test file (in `tests/`) wires itself up like this:
//!
//! ```ignore
//! #![feature(custom_test_frameworks)]
//! #![test_runner(piko_kernel::testing::test_runner)]
//! #![reexport_test_harness_main = "test_main"]
//! ```
//!
//! marks test functions with `#[test_case]`, and calls the generated
//! `test_main()` from its `KernelMain` after UART and heap init.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::arch::qemu::{exit_qemu, QemuExitCode};
use crate::drivers::uart::Uart;
use crate::scheduler;
use crate::{debug, debugln};

/// Number of tests already run, for the per-test progress prefix.
static TESTS_STARTED: AtomicUsize = AtomicUsize::new(0);

/// Total number of tests in this run.
static TESTS_TOTAL: AtomicUsize = AtomicUsize::new(0);

/// Trait for types that can be run as tests
pub trait Testable {
    /// Run the test and report results
    fn run(&self);
}

/// Implement Testable for any function with no arguments
impl<T: Fn()> Testable for T {
    fn run(&self) {
        let number = TESTS_STARTED.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "[{:02}/{:02}] {}...",
            number,
            TESTS_TOTAL.load(Ordering::Relaxed),
            core::any::type_name::<T>()
        );

        // Run the test - if it panics, the panic handler takes over
        self();

        debugln!(" [ok]");
    }
}

/// The main test runner function
///
/// Called by the generated harness with every `#[test_case]` function.
/// Runs them in order and exits QEMU with the appropriate exit code.
pub fn test_runner(tests: &[&dyn Testable]) {
    TESTS_TOTAL.store(tests.len(), Ordering::Relaxed);

    debugln!("piko-kernel scheduler test run: {} tests", tests.len());
    debugln!();

    for test in tests {
        test.run();
    }

    debugln!();
    debugln!("test run complete: all {} tests passed", tests.len());

    exit_qemu(QemuExitCode::Success);
}

/// Called when a test panics
///
/// Reports the failure, dumps the scheduler task table for post-mortem
/// context, and exits QEMU with a failure code.
pub fn test_panic_handler(info: &core::panic::PanicInfo) -> ! {
    debugln!(" [FAILED]");
    debugln!();

    if let Some(location) = info.location() {
        debugln!("at {}:{}", location.file(), location.line());
    }

    if let Some(message) = info.message().as_str() {
        debugln!("{}", message);
    }

    debugln!();
    let mut uart = Uart::new();
    if !scheduler::try_list_tasks(&mut uart) {
        debugln!("(task table unavailable: scheduler lock was held at panic)");
    }

    exit_qemu(QemuExitCode::Failed);
}
