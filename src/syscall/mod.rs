//! Syscall table and dispatcher entry point.
//!
//! The SVC entry glue passes `(syscall_nr, arg1..arg4)` into [`dispatch`].
//! Types/constants live in `types`, kernel dispatch logic in `dispatch`,
//! and user/raw wrappers in their dedicated submodules.

mod dispatch;
mod types;

pub mod abi;
pub mod user;

pub use dispatch::{
    dispatch, dispatch_checked, set_syscall_trace_enabled, syscall_name_for_number,
};

pub use types::{
    decode_result, syscall_result_to_raw, SysError, SyscallError, SyscallId, SyscallResult,
    SYSCALL_ERR_INVALID_ARG, SYSCALL_ERR_UNSUPPORTED, SYSCALL_OK,
};
