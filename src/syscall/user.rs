//! User-side syscall wrappers.
//!
//! Ergonomic wrappers around the raw `svc #0` ABI:
//! - `sys_gettime` for the coarse clock,
//! - `sys_get_task_name` for the caller's own task name,
//! - `sys_print` for Notice-level console output,
//! - `sys_sleep` for timed sleeps,
//! - `sys_exit` to terminate the current task.
//!
//! Design goals:
//! - keep call sites simple (`Result`-based API where possible),
//! - keep syscall return decoding explicit at wrapper boundaries,
//! - keep unsafe and ABI details local to wrapper implementations.

use super::{abi, decode_result, SysError, SyscallId};

/// Returns the current whole seconds from the clock source.
#[inline(always)]
pub fn sys_gettime() -> Result<u32, SysError> {
    // SAFETY:
    // - Zero-argument call; no memory is handed to the kernel.
    let raw = unsafe { abi::syscall0(SyscallId::GetTime as u32) };
    decode_result(raw)
}

/// Copies the calling task's name into `buffer` (NUL-terminated).
///
/// Returns the number of name bytes copied, excluding the terminator.
#[inline(always)]
pub fn sys_get_task_name(buffer: &mut [u8]) -> Result<usize, SysError> {
    // SAFETY:
    // - The pointer/length pair describes exactly the caller's buffer.
    let raw = unsafe {
        abi::syscall2(
            SyscallId::GetTaskName as u32,
            buffer.as_mut_ptr() as u32,
            buffer.len() as u32,
        )
    };
    decode_result(raw).map(|copied| copied as usize)
}

/// Writes a NUL-terminated string to the kernel log at Notice level.
///
/// # Safety
/// `cstr` must point to a readable NUL-terminated string.
#[inline(always)]
pub unsafe fn sys_print(cstr: *const u8) -> Result<u32, SysError> {
    // SAFETY:
    // - Caller guarantees `cstr` points at a NUL-terminated string.
    let raw = unsafe { abi::syscall1(SyscallId::Print as u32, cstr as u32) };
    decode_result(raw)
}

/// Sleeps the calling task for at least `seconds`.
#[inline(always)]
pub fn sys_sleep(seconds: u32) -> Result<(), SysError> {
    // SAFETY:
    // - Plain value argument; no memory is handed to the kernel.
    let raw = unsafe { abi::syscall1(SyscallId::Sleep as u32, seconds) };
    decode_result(raw).map(|_| ())
}

/// Terminates the calling task.
///
/// The kernel never schedules the task again, so this call does not return.
#[inline(always)]
pub fn sys_exit() -> ! {
    // SAFETY:
    // - Zero-argument call; no memory is handed to the kernel.
    let _ = unsafe { abi::syscall0(SyscallId::Exit as u32) };
    loop {
        core::hint::spin_loop();
    }
}
