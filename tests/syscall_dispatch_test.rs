//! Syscall dispatcher integration tests.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(piko_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use piko_kernel::scheduler::{self as sched, TaskState};
use piko_kernel::syscall::{
    self, SysError, SyscallError, SyscallId, SYSCALL_ERR_INVALID_ARG, SYSCALL_ERR_UNSUPPORTED,
    SYSCALL_OK,
};

#[no_mangle]
#[link_section = ".text.boot"]
pub extern "C" fn KernelMain() -> ! {
    piko_kernel::drivers::uart::init();
    piko_kernel::memory::heap::init();
    piko_kernel::syscall::set_syscall_trace_enabled(false);

    test_main();

    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    piko_kernel::testing::test_panic_handler(info)
}

/// Contract: syscall ids remain stable.
/// Given: The wire contract fixes numbers 0..4.
/// When: The enum discriminants are compared against the contract.
/// Then: Every number matches; a drift here breaks every user task.
#[test_case]
fn test_syscall_ids_are_stable() {
    assert!(SyscallId::GetTime as u32 == 0, "GetTime syscall id changed");
    assert!(
        SyscallId::GetTaskName as u32 == 1,
        "GetTaskName syscall id changed"
    );
    assert!(SyscallId::Print as u32 == 2, "Print syscall id changed");
    assert!(SyscallId::Sleep as u32 == 3, "Sleep syscall id changed");
    assert!(SyscallId::Exit as u32 == 4, "Exit syscall id changed");
}

#[test_case]
fn test_unknown_syscall_number_returns_minus_one() {
    let raw = syscall::dispatch(99, 0, 0, 0, 0);
    assert!(
        raw == SYSCALL_ERR_UNSUPPORTED,
        "unknown syscall must return the -1 sentinel"
    );
    assert!(
        raw == u32::MAX,
        "the unsupported sentinel must be -1 in two's complement"
    );

    let checked = syscall::dispatch_checked(99, 0, 0, 0, 0);
    assert!(
        checked == Err(SyscallError::Unsupported),
        "typed dispatch must classify the number as unsupported"
    );
}

#[test_case]
fn test_syscall_names_resolve_for_all_known_numbers() {
    assert!(syscall::syscall_name_for_number(0) == "GetTime");
    assert!(syscall::syscall_name_for_number(1) == "GetTaskName");
    assert!(syscall::syscall_name_for_number(2) == "Print");
    assert!(syscall::syscall_name_for_number(3) == "Sleep");
    assert!(syscall::syscall_name_for_number(4) == "Exit");
    assert!(syscall::syscall_name_for_number(1234) == "Unknown");
}

#[test_case]
fn test_gettime_reports_clock_seconds() {
    let raw = syscall::dispatch(SyscallId::GetTime as u32, 0, 0, 0, 0);
    assert!(
        raw == piko_kernel::drivers::timer::seconds(),
        "GetTime must report the clock source's seconds counter"
    );
}

#[test_case]
fn test_get_task_name_copies_current_name_nul_terminated() {
    sched::init();

    let mut buffer = [0xAAu8; 16];
    let raw = syscall::dispatch(
        SyscallId::GetTaskName as u32,
        buffer.as_mut_ptr() as u32,
        buffer.len() as u32,
        0,
        0,
    );

    assert!(raw == 4, "copied length must equal the name length");
    assert!(&buffer[..4] == b"Main", "buffer must hold the current task name");
    assert!(buffer[4] == 0, "the copied name must be NUL-terminated");
}

#[test_case]
fn test_get_task_name_truncates_to_caller_buffer() {
    sched::init();

    let mut buffer = [0xAAu8; 3];
    let raw = syscall::dispatch(
        SyscallId::GetTaskName as u32,
        buffer.as_mut_ptr() as u32,
        buffer.len() as u32,
        0,
        0,
    );

    assert!(raw == 2, "copy must leave room for the terminator");
    assert!(&buffer[..2] == b"Ma", "truncated copy must keep a name prefix");
    assert!(buffer[2] == 0, "truncated copy must still be NUL-terminated");
}

#[test_case]
fn test_get_task_name_rejects_bad_buffers() {
    sched::init();

    let raw = syscall::dispatch(SyscallId::GetTaskName as u32, 0, 16, 0, 0);
    assert!(
        raw == SYSCALL_ERR_INVALID_ARG,
        "a null buffer pointer must be rejected"
    );

    let mut buffer = [0u8; 4];
    let raw = syscall::dispatch(
        SyscallId::GetTaskName as u32,
        buffer.as_mut_ptr() as u32,
        0,
        0,
        0,
    );
    assert!(
        raw == SYSCALL_ERR_INVALID_ARG,
        "a zero-length buffer must be rejected"
    );
}

#[test_case]
fn test_print_writes_string_and_reports_length() {
    let message = b"hello from a task\0";
    let raw = syscall::dispatch(SyscallId::Print as u32, message.as_ptr() as u32, 0, 0, 0);
    assert!(
        raw == (message.len() - 1) as u32,
        "Print must report the number of bytes written"
    );

    let raw = syscall::dispatch(SyscallId::Print as u32, 0, 0, 0, 0);
    assert!(
        raw == SYSCALL_ERR_INVALID_ARG,
        "a null string pointer must be rejected"
    );
}

#[test_case]
fn test_zero_second_sleep_returns_ok_immediately() {
    sched::init();

    let raw = syscall::dispatch(SyscallId::Sleep as u32, 0, 0, 0, 0);
    assert!(raw == SYSCALL_OK, "Sleep must report 0 on the wire");
    assert!(
        sched::task_state(0) == Some(TaskState::Ready),
        "a zero-length sleep must leave the caller Ready"
    );
}

#[test_case]
fn test_exit_terminates_current_task_and_requests_reschedule() {
    sched::init();

    let raw = syscall::dispatch(SyscallId::Exit as u32, 0, 0, 0, 0);
    assert!(raw == SYSCALL_OK, "Exit must report 0 on the wire");
    assert!(
        sched::task_state(0) == Some(TaskState::Terminated),
        "Exit must mark the calling task Terminated"
    );
    assert!(
        sched::should_switch_on_irq_return(),
        "Exit must arm the trap-return context switch"
    );

    // Reset so later tests see a live scheduler.
    sched::init();
}

#[test_case]
fn test_decode_result_classifies_the_error_space() {
    assert!(syscall::decode_result(SYSCALL_ERR_UNSUPPORTED) == Err(SysError::Enosys));
    assert!(syscall::decode_result(SYSCALL_ERR_INVALID_ARG) == Err(SysError::Einval));
    assert!(syscall::decode_result(0) == Ok(0));
    assert!(syscall::decode_result(41) == Ok(41));
}
