//! Syscall numbers, typed results, and raw ABI encoding.

/// Stable syscall numbers exposed to user tasks.
///
/// The number travels in the caller-preserved `r7`; arguments in `r0..r3`.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallId {
    /// Current whole seconds from the clock source.
    GetTime = 0,
    /// Copy the current task's name into a caller-sized buffer.
    GetTaskName = 1,
    /// Write a NUL-terminated string to the logger at Notice level.
    Print = 2,
    /// Sleep the calling task for whole seconds.
    Sleep = 3,
    /// Terminate the calling task.
    Exit = 4,
}

impl SyscallId {
    /// Decodes a raw syscall number.
    pub const fn from_raw(syscall_nr: u32) -> Option<SyscallId> {
        match syscall_nr {
            0 => Some(SyscallId::GetTime),
            1 => Some(SyscallId::GetTaskName),
            2 => Some(SyscallId::Print),
            3 => Some(SyscallId::Sleep),
            4 => Some(SyscallId::Exit),
            _ => None,
        }
    }
}

/// Unknown syscall number (−1 on the wire).
pub const SYSCALL_ERR_UNSUPPORTED: u32 = u32::MAX;

/// Invalid argument combination for a known syscall.
pub const SYSCALL_ERR_INVALID_ARG: u32 = u32::MAX - 1;

/// Successful syscall return code for void-like operations.
pub const SYSCALL_OK: u32 = 0;

/// Kernel-internal syscall error space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Unknown syscall number.
    Unsupported,
    /// Invalid syscall arguments.
    InvalidArg,
}

pub type SyscallResult<T> = Result<T, SyscallError>;

/// Encodes a typed result into the raw sentinel space returned in `r0`.
pub fn syscall_result_to_raw(result: SyscallResult<u32>) -> u32 {
    match result {
        Ok(value) => value,
        Err(SyscallError::Unsupported) => SYSCALL_ERR_UNSUPPORTED,
        Err(SyscallError::InvalidArg) => SYSCALL_ERR_INVALID_ARG,
    }
}

/// User-facing syscall error space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysError {
    /// Unknown syscall number.
    Enosys,
    /// Invalid syscall arguments.
    Einval,
    /// Any unclassified kernel return value in the error range.
    Unknown(u32),
}

/// Decodes a raw syscall return value into `Result`.
#[inline]
pub fn decode_result(raw: u32) -> Result<u32, SysError> {
    match raw {
        SYSCALL_ERR_UNSUPPORTED => Err(SysError::Enosys),
        SYSCALL_ERR_INVALID_ARG => Err(SysError::Einval),
        x if x >= SYSCALL_ERR_INVALID_ARG => Err(SysError::Unknown(x)),
        value => Ok(value),
    }
}
