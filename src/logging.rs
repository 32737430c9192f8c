//! Central leveled kernel logging over the debug UART.
//!
//! Every log line carries a target (the originating subsystem) and a
//! severity. Fatal conditions go through the [`fatal!`] macro, which logs at
//! Panic severity and then halts through the panic machinery.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::drivers::uart;

/// Log severities, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Unrecoverable error; the caller halts the system afterwards.
    Panic = 0,
    /// Error the system survives (e.g. a rejected system call).
    Error = 1,
    Warning = 2,
    /// Normal operational message; also used for the print system call.
    Notice = 3,
    /// Trace output, filtered out when the threshold is lowered.
    Debug = 4,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Panic => "panic",
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Notice => "notice",
            LogLevel::Debug => "debug",
        }
    }
}

/// Runtime severity threshold; lines below it are dropped.
static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Debug as u8);

/// Sets the maximum severity that is still written out.
#[allow(dead_code)]
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Central target-based log function.
pub fn logln(level: LogLevel, target: &str, args: fmt::Arguments<'_>) {
    if level as u8 > MAX_LEVEL.load(Ordering::Relaxed) {
        return;
    }
    uart::_debug_print(format_args!("{}: {}: {}\n", target, level.as_str(), args));
}

/// Logs at Panic severity, then panics (the panic handler halts the CPU).
///
/// This is the single fatal-error path: capacity exhaustion, invariant
/// violations, handler double-registration, and unbalanced counters all
/// terminate here.
#[macro_export]
macro_rules! fatal {
    ($target:expr, $($arg:tt)*) => {{
        $crate::logging::logln(
            $crate::logging::LogLevel::Panic,
            $target,
            format_args!($($arg)*),
        );
        panic!($($arg)*);
    }};
}
