//! Task control blocks and the task life cycle.
//!
//! A [`Task`] owns its saved register image, its heap-allocated stack, and
//! the intrusive link used to park it on a wait list. Tasks are created by
//! the [`Task::new`] factory and handed to the scheduler, which owns them
//! from registration until they are reaped.

use core::alloc::Layout;
use core::ptr;

extern crate alloc;
use alloc::alloc as heap_alloc;
use alloc::boxed::Box;
use alloc::string::String;

use crate::arch::interrupts::TaskRegisters;

/// Entry point type for schedulable tasks.
///
/// A task whose entry function returns terminates cooperatively through the
/// entry trampoline.
pub type TaskFn = extern "C" fn();

/// Size of each task's heap-allocated stack.
pub const TASK_STACK_SIZE: usize = 32 * 1024;

/// AAPCS stack alignment.
const STACK_ALIGNMENT: usize = 8;

/// Initial PSR for new tasks: System mode, ARM state, IRQs enabled.
const TASK_INITIAL_PSR: u32 = 0x1F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// Scheduler has not been initialized.
    NotInitialized,

    /// Heap allocation for the task stack failed.
    StackAllocationFailed,
}

/// Life-cycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created while new-task suspension is in force; not yet eligible.
    New,

    /// Eligible to run. The currently running task is also `Ready`.
    Ready,

    /// Waiting until a monotonic-clock tick deadline.
    Sleeping,

    /// Parked on a wait list with no timeout.
    Blocked,

    /// Parked on a wait list with a tick deadline.
    BlockedWithTimeout,

    /// Finished; the slot and stack are reclaimed on the next selection
    /// pass. The current task survives one more pass because it cannot
    /// free the stack it is still running on.
    Terminated,
}

impl TaskState {
    /// State mnemonic used by the task listing.
    pub(crate) const fn mnemonic(self) -> &'static str {
        match self {
            TaskState::New => "new",
            TaskState::Ready => "ready",
            TaskState::Blocked | TaskState::BlockedWithTimeout => "block",
            TaskState::Sleeping => "sleep",
            TaskState::Terminated => "term",
        }
    }
}

/// Task control block.
pub struct Task {
    /// Short human-readable label, used for lookup and diagnostics.
    name: String,

    state: TaskState,

    /// A suspended task is never selected, regardless of state.
    suspended: bool,

    /// Tick deadline for `Sleeping`/`BlockedWithTimeout`. Doubles as the
    /// post-wake signal for blocked tasks: zero after a timeout expiry,
    /// non-zero after an explicit wake.
    wake_ticks: u32,

    /// Saved CPU context; the layout matches the trap-stub register image.
    pub(crate) regs: TaskRegisters,

    /// Forward link threading this TCB onto at most one wait list.
    /// Null whenever the task is not parked.
    pub(crate) wait_next: *mut Task,

    /// Set by the factory once stack and entry are fully wired. The
    /// selector skips a task whose saved PC still points at the entry
    /// trampoline while this is unset.
    ready_for_scheduling: bool,

    entry: Option<TaskFn>,

    /// Base of the heap-allocated stack; null for the bootstrap task,
    /// which keeps running on the boot stack.
    stack_base: *mut u8,
    stack_size: usize,
}

impl Task {
    /// Creates a task with a fresh stack and an initial register image that
    /// resumes at the entry trampoline.
    ///
    /// The returned task is not yet eligible for selection; registration
    /// and [`mark_ready_for_scheduling`](Task::mark_ready_for_scheduling)
    /// complete the wiring.
    pub fn new(name: &str, entry: TaskFn) -> Result<Box<Task>, SpawnError> {
        // SAFETY:
        // - Size is non-zero and the alignment is a power of two.
        let layout =
            unsafe { Layout::from_size_align_unchecked(TASK_STACK_SIZE, STACK_ALIGNMENT) };
        // SAFETY:
        // - Layout has non-zero size.
        let stack_base = unsafe { heap_alloc::alloc(layout) };
        if stack_base.is_null() {
            return Err(SpawnError::StackAllocationFailed);
        }

        let stack_top = (stack_base as usize + TASK_STACK_SIZE) & !(STACK_ALIGNMENT - 1);

        let mut task = Box::new(Task {
            name: String::from(name),
            state: TaskState::Ready,
            suspended: false,
            wake_ticks: 0,
            regs: TaskRegisters {
                cpsr: TASK_INITIAL_PSR,
                r: [0; 13],
                sp: stack_top as u32,
                lr: 0,
                pc: task_entry_pc(),
            },
            wait_next: ptr::null_mut(),
            ready_for_scheduling: false,
            entry: Some(entry),
            stack_base,
            stack_size: TASK_STACK_SIZE,
        });

        // The entry trampoline receives the owning TCB in r0. The box's
        // heap address is stable for the task's whole lifetime.
        let tcb_ptr = &mut *task as *mut Task;
        task.regs.r[0] = tcb_ptr as usize as u32;

        Ok(task)
    }

    /// Creates the bootstrap "Main" task.
    ///
    /// It represents the context the kernel booted on: no own stack, no
    /// entry function, and a register image that is first filled in when
    /// the task is preempted.
    pub(crate) fn new_main() -> Box<Task> {
        Box::new(Task {
            name: String::from("Main"),
            state: TaskState::Ready,
            suspended: false,
            wake_ticks: 0,
            regs: TaskRegisters::default(),
            wait_next: ptr::null_mut(),
            ready_for_scheduling: true,
            entry: None,
            stack_base: ptr::null_mut(),
            stack_size: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    /// Promotes a `New` task to `Ready` once new-task suspension is lifted.
    pub(crate) fn start(&mut self) {
        if self.state == TaskState::New {
            self.state = TaskState::Ready;
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub(crate) fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    pub fn wake_ticks(&self) -> u32 {
        self.wake_ticks
    }

    pub(crate) fn set_wake_ticks(&mut self, wake_ticks: u32) {
        self.wake_ticks = wake_ticks;
    }

    pub fn is_ready_for_scheduling(&self) -> bool {
        self.ready_for_scheduling
    }

    pub(crate) fn mark_ready_for_scheduling(&mut self) {
        self.ready_for_scheduling = true;
    }

    pub(crate) fn entry(&self) -> Option<TaskFn> {
        self.entry
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if !self.stack_base.is_null() {
            // SAFETY:
            // - `stack_base` was allocated in `Task::new` with this layout.
            // - The scheduler never drops the currently running task, so the
            //   stack cannot be in use here.
            unsafe {
                heap_alloc::dealloc(
                    self.stack_base,
                    Layout::from_size_align_unchecked(self.stack_size, STACK_ALIGNMENT),
                );
            }
        }
    }
}

/// First code executed in a new task's context.
///
/// The entry stub contract passes the owning TCB in `r0`. When the entry
/// function returns, the task exits cooperatively.
pub(crate) extern "C" fn task_entry(task: *mut Task) -> ! {
    // SAFETY:
    // - The scheduler owns the TCB and keeps it alive while the task runs.
    let entry = unsafe { (*task).entry() };
    if let Some(entry) = entry {
        entry();
    }
    super::roundrobin::exit_current_task()
}

/// Saved-PC value that marks a task still parked at the entry trampoline.
pub(crate) fn task_entry_pc() -> u32 {
    task_entry as *const () as usize as u32
}
