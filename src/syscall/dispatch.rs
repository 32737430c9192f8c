//! Kernel-side syscall dispatcher (SVC trap path).
//!
//! Responsibilities of this module:
//! - decode syscall number + ABI arguments,
//! - route to the corresponding kernel implementation,
//! - enforce minimal argument validation at syscall boundaries,
//! - return stable numeric result/error codes to caller context.
//!
//! ABI for [`dispatch`] (provided by the SVC entry glue):
//! - `r7` -> `syscall_nr`
//! - `r0..r3` -> `arg1..arg4`
//! - `r0` <- raw result

use core::slice;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::drivers::timer;
use crate::logging::{self, LogLevel};
use crate::scheduler;

use super::{
    syscall_result_to_raw, SyscallError, SyscallId, SyscallResult, SYSCALL_OK,
};

/// Maximum number of bytes scanned for the Print syscall's terminator.
/// The cap bounds syscall execution time so one call cannot monopolize
/// the CPU; longer strings must be chunked by the caller.
const MAX_PRINT_LEN: usize = 4096;

/// Global switch for per-syscall trace logging.
static SYSCALL_TRACE_ENABLED: AtomicBool = AtomicBool::new(true);

/// Enable/disable syscall trace logging.
#[allow(dead_code)]
pub fn set_syscall_trace_enabled(enabled: bool) {
    SYSCALL_TRACE_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Returns whether syscall trace logging is currently enabled.
pub fn syscall_trace_enabled() -> bool {
    SYSCALL_TRACE_ENABLED.load(Ordering::Relaxed)
}

/// Returns the stable human-readable syscall name for a raw syscall number.
///
/// Used by dispatcher logging so serial traces remain understandable without
/// requiring external number-to-name lookup tables.
pub const fn syscall_name_for_number(syscall_nr: u32) -> &'static str {
    match SyscallId::from_raw(syscall_nr) {
        Some(SyscallId::GetTime) => "GetTime",
        Some(SyscallId::GetTaskName) => "GetTaskName",
        Some(SyscallId::Print) => "Print",
        Some(SyscallId::Sleep) => "Sleep",
        Some(SyscallId::Exit) => "Exit",
        None => "Unknown",
    }
}

/// Resolves the syscall number and dispatches to the corresponding handler.
///
/// Every recognized number maps to exactly one arm; an unrecognized number
/// is logged at Error level and reported as unsupported (−1 on the wire).
/// Returns kernel-internal typed results; raw ABI conversion happens at the
/// syscall boundary in [`dispatch`].
pub fn dispatch_checked(
    syscall_nr: u32,
    arg1: u32,
    arg2: u32,
    _arg3: u32,
    _arg4: u32,
) -> SyscallResult<u32> {
    let result = match SyscallId::from_raw(syscall_nr) {
        Some(SyscallId::GetTime) => sys_gettime_impl(),
        Some(SyscallId::GetTaskName) => sys_get_task_name_impl(arg1 as *mut u8, arg2 as usize),
        Some(SyscallId::Print) => sys_print_impl(arg1 as *const u8),
        Some(SyscallId::Sleep) => sys_sleep_impl(arg1),
        Some(SyscallId::Exit) => sys_exit_impl(),
        None => {
            logging::logln(
                LogLevel::Error,
                "syscall",
                format_args!("system call number {} not recognized", syscall_nr),
            );
            Err(SyscallError::Unsupported)
        }
    };

    if syscall_trace_enabled() {
        logging::logln(
            LogLevel::Debug,
            "syscall",
            format_args!(
                "nr={} name={} arg1={:#x} arg2={:#x} ret={:#x}",
                syscall_nr,
                syscall_name_for_number(syscall_nr),
                arg1,
                arg2,
                syscall_result_to_raw(result)
            ),
        );
    }

    result
}

/// ABI-compatible raw dispatcher (`Result` encoded to sentinel values).
pub fn dispatch(syscall_nr: u32, arg1: u32, arg2: u32, arg3: u32, arg4: u32) -> u32 {
    syscall_result_to_raw(dispatch_checked(syscall_nr, arg1, arg2, arg3, arg4))
}

/// Implements `GetTime`: whole seconds from the clock source.
fn sys_gettime_impl() -> SyscallResult<u32> {
    Ok(timer::seconds())
}

/// Implements `GetTaskName(buf, len)`.
///
/// Copies the current task's name into the caller buffer, truncated to the
/// buffer size, and NUL-terminates it. Returns the number of name bytes
/// copied (excluding the terminator).
fn sys_get_task_name_impl(ptr: *mut u8, len: usize) -> SyscallResult<u32> {
    if ptr.is_null() || len == 0 {
        return Err(SyscallError::InvalidArg);
    }

    let buffer = unsafe {
        // SAFETY:
        // - This requires `unsafe` because it builds a slice from a raw caller pointer.
        // - The caller claims `ptr..ptr+len` is writable; null was rejected
        //   above.
        slice::from_raw_parts_mut(ptr, len)
    };

    let copied = scheduler::copy_current_task_name(&mut buffer[..len - 1]);
    buffer[copied] = 0;

    Ok(copied as u32)
}

/// Implements `Print(cstr)`.
///
/// Writes the NUL-terminated string to the logger at Notice level. The scan
/// for the terminator is capped at `MAX_PRINT_LEN` bytes; the string must
/// be valid UTF-8. Returns the number of bytes written.
fn sys_print_impl(ptr: *const u8) -> SyscallResult<u32> {
    if ptr.is_null() {
        return Err(SyscallError::InvalidArg);
    }

    let mut len = 0usize;
    while len < MAX_PRINT_LEN {
        // SAFETY:
        // - The caller claims a NUL-terminated string at `ptr`; the scan is
        //   bounded by `MAX_PRINT_LEN`.
        let byte = unsafe { core::ptr::read(ptr.add(len)) };
        if byte == 0 {
            break;
        }
        len += 1;
    }

    // SAFETY:
    // - `ptr..ptr+len` was walked byte-by-byte above.
    let bytes = unsafe { slice::from_raw_parts(ptr, len) };
    let Ok(text) = core::str::from_utf8(bytes) else {
        return Err(SyscallError::InvalidArg);
    };

    logging::logln(LogLevel::Notice, "user", format_args!("{}", text));

    Ok(len as u32)
}

/// Implements `Sleep(seconds)`: sleeps the calling task on the scheduler.
///
/// The call does not return to the caller until the sleep has elapsed; the
/// wire-level result is 0.
fn sys_sleep_impl(seconds: u32) -> SyscallResult<u32> {
    scheduler::sleep(seconds);
    Ok(SYSCALL_OK)
}

/// Implements `Exit`.
///
/// Marks the current task `Terminated` and returns 0; the SVC return glue
/// performs the actual reschedule, and the task is reaped on a later
/// selection pass once it is no longer current.
fn sys_exit_impl() -> SyscallResult<u32> {
    scheduler::terminate_current();
    Ok(SYSCALL_OK)
}
