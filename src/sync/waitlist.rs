//! Intrusive wait list for scheduler blocking.
//!
//! A `WaitList` is just the head of a singly linked chain of task control
//! blocks threaded through their `wait_next` field, so parking a task never
//! allocates. The head is owned by whoever exposes the wait condition (a
//! driver, a channel, a test); tasks park on it with
//! [`block_on`](crate::scheduler::block_on) and are released in one shot by
//! [`wake_all`](crate::scheduler::wake_all).
//!
//! The linkage is only ever touched by the scheduler while it holds its
//! IRQ-masking lock; a task is on at most one wait list at a time.

use core::cell::UnsafeCell;
use core::ptr;

use crate::scheduler::Task;

pub struct WaitList {
    head: UnsafeCell<*mut Task>,
}

impl WaitList {
    pub const fn new() -> Self {
        Self {
            head: UnsafeCell::new(ptr::null_mut()),
        }
    }

    /// Raw access to the head pointer for the scheduler's block/wake paths.
    ///
    /// Callers must hold the scheduler lock for any read or write through
    /// the returned pointer.
    pub(crate) fn head_cell(&self) -> *mut *mut Task {
        self.head.get()
    }

    /// Returns whether any task is currently parked on this list.
    ///
    /// Only meaningful when no block/wake operation is in flight.
    pub fn is_empty(&self) -> bool {
        // SAFETY:
        // - A plain pointer-sized read; the quiescence requirement is on the
        //   caller per the doc contract.
        unsafe { (*self.head.get()).is_null() }
    }
}

impl Default for WaitList {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY:
// - The head pointer is only dereferenced or mutated under the scheduler
//   lock, which also masks IRQs on this single-core system.
unsafe impl Sync for WaitList {}
unsafe impl Send for WaitList {}
