//! Scheduler critical-section lock.
//!
//! On this single-core kernel, mutual exclusion is the IRQ mask itself:
//! once IRQs are off, the timer tick and trap paths cannot run, so the
//! context that masked them owns every scheduler structure until it
//! unmasks them. `IrqLock` packages that discipline. Acquiring masks IRQs
//! and restores the previous mask state on release, so nested critical
//! sections compose.
//!
//! The held flag is not there for contention. With IRQs masked there is
//! nobody left to contend with; a lock that is already held can only mean
//! reentrant acquisition from the same context (for example a task-switch
//! hook calling back into the scheduler). Waiting for that can never
//! succeed, so [`IrqLock::lock`] treats it as fatal instead of spinning.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::interrupts;

pub struct IrqLock<T> {
    held: AtomicBool,
    data: UnsafeCell<T>,
}

impl<T> IrqLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            held: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Masks IRQs and takes the lock.
    ///
    /// Reentrant acquisition is fatal; see the module docs for why there
    /// is nothing to wait for on a single core.
    pub fn lock(&self) -> IrqLockGuard<'_, T> {
        match self.try_lock() {
            Some(guard) => guard,
            None => crate::fatal!("sync", "reentrant scheduler lock acquisition"),
        }
    }

    /// Masks IRQs and takes the lock, unless this context already holds it.
    ///
    /// Used by panic-path diagnostics that must not trip over a lock the
    /// panicking code was holding.
    pub fn try_lock(&self) -> Option<IrqLockGuard<'_, T>> {
        let irqs_were_enabled = interrupts::are_enabled();
        interrupts::disable();

        if self.held.swap(true, Ordering::Acquire) {
            if irqs_were_enabled {
                interrupts::enable();
            }
            return None;
        }

        Some(IrqLockGuard {
            lock: self,
            irqs_were_enabled,
        })
    }
}

pub struct IrqLockGuard<'a, T> {
    lock: &'a IrqLock<T>,
    irqs_were_enabled: bool,
}

impl<T> Deref for IrqLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY:
        // - IRQs are masked and the held flag is set: this guard is the
        //   only path to `data` until it drops.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for IrqLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY:
        // - IRQs are masked and the held flag is set: this guard is the
        //   only path to `data` until it drops.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for IrqLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
        if self.irqs_were_enabled {
            interrupts::enable();
        }
    }
}

// SAFETY:
// - Exclusive access to `data` follows from the IRQ mask plus the held
//   flag on this single-core system.
// - `T: Send` ensures it is safe to hand the value between the task-side
//   and IRQ-side contexts that take the lock.
unsafe impl<T: Send> Sync for IrqLock<T> {}
unsafe impl<T: Send> Send for IrqLock<T> {}
