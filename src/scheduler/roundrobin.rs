//! Cooperative round-robin scheduler core with timer-driven preemption.
//!
//! The scheduler owns a fixed-capacity table of task control blocks and
//! multiplexes them over the single CPU. Tasks leave the CPU at explicit
//! yield/sleep/block/terminate points; when preemptive multitasking is
//! enabled, the periodic timer tick additionally forces a reschedule once
//! per tick through the trap-stub return path.
//!
//! All table and wait-list state lives behind one IRQ-masking lock, so
//! every multi-step update appears atomic to the timer IRQ path.

use core::arch::asm;
use core::fmt::{self, Write as _};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

extern crate alloc;
use alloc::boxed::Box;

use crate::arch::interrupts::TaskRegisters;
use crate::drivers::timer::{self, CLOCKHZ};
use crate::sync::irqlock::IrqLock;
use crate::sync::waitlist::WaitList;

use super::task::{task_entry_pc, SpawnError, Task, TaskFn, TaskState};

// The scheduler persists task contexts as 32-bit register images and
// compares tick deltas as signed 32-bit values; a single core is assumed
// throughout (critical sections are plain IRQ masking).
#[cfg(not(target_pointer_width = "32"))]
compile_error!("this scheduler only supports single-core 32-bit targets");

/// Capacity of the task table.
pub const MAX_TASKS: usize = 64;

/// Per-chunk cap for `sleep`, well below the ~2147 s bound where the tick
/// delta would overflow its signed 32-bit comparison.
const SLEEP_MAX_SECONDS: u32 = 1800;

/// Post-wake marker stored for blocked tasks without a deadline: any wake
/// of such a task is an event delivery, never a timeout.
const WAKE_EVENT_PENDING: u32 = u32::MAX;

const LOG_TARGET: &str = "sched";

/// Handler invoked with the affected task on a context switch or during
/// terminated-task reaping.
pub type TaskHandler = fn(&Task);

/// Runtime state of the scheduler.
struct SchedulerState {
    /// Global initialization latch set by [`init`].
    initialized: bool,

    /// Fixed-capacity task table. Slots inside `[0, n_tasks)` may be empty
    /// (holes left by reaping); slots beyond `n_tasks` must always be
    /// empty, which the selection pass verifies.
    slots: [Option<Box<Task>>; MAX_TASKS],

    /// Bound of the valid slot prefix.
    n_tasks: usize,

    /// Table index of the currently running task. That task's state is
    /// `Ready` whenever it is on the CPU.
    n_current: usize,

    /// Balanced suspend-new-tasks counter. While positive, added tasks
    /// start out in [`TaskState::New`].
    suspend_new_tasks: u32,

    task_switch_handler: Option<TaskHandler>,
    task_termination_handler: Option<TaskHandler>,
}

impl SchedulerState {
    const fn new() -> Self {
        Self {
            initialized: false,
            slots: [const { None }; MAX_TASKS],
            n_tasks: 0,
            n_current: 0,
            suspend_new_tasks: 0,
            task_switch_handler: None,
            task_termination_handler: None,
        }
    }
}

// SAFETY:
// - `SchedulerState` is only accessed behind `IrqLock<SchedulerState>`.
// - The raw `wait_next` pointers inside tasks always reference other
//   scheduler-owned TCBs and are only followed under the same lock.
unsafe impl Send for SchedulerState {}

static SCHED: IrqLock<SchedulerState> = IrqLock::new(SchedulerState::new());

/// Executes `f` while holding the scheduler lock (IRQs masked).
fn with_sched<R>(f: impl FnOnce(&mut SchedulerState) -> R) -> R {
    let mut sched = SCHED.lock();
    f(&mut sched)
}

/// Clock access used by deadline arithmetic.
///
/// This isolates the hardware timer from selection logic and makes the tick
/// source replaceable in tests without modifying scheduler internals.
#[derive(Clone, Copy)]
pub struct SchedulerTimeSource {
    /// Returns the monotonic tick counter at `CLOCKHZ`.
    pub clock_ticks: fn() -> u32,
}

impl SchedulerTimeSource {
    const fn default_source() -> Self {
        Self {
            clock_ticks: timer::clock_ticks,
        }
    }
}

static TIME_SOURCE: IrqLock<SchedulerTimeSource> =
    IrqLock::new(SchedulerTimeSource::default_source());

/// Replace the tick source used by deadline arithmetic.
pub fn set_time_source(source: SchedulerTimeSource) {
    *TIME_SOURCE.lock() = source;
}

/// Restore the hardware system-timer tick source.
pub fn reset_time_source_to_default() {
    *TIME_SOURCE.lock() = SchedulerTimeSource::default_source();
}

fn current_ticks() -> u32 {
    (TIME_SOURCE.lock().clock_ticks)()
}

fn current_task(s: &SchedulerState) -> &Task {
    match s.slots[s.n_current].as_deref() {
        Some(task) => task,
        None => crate::fatal!(LOG_TARGET, "current task slot {} is empty", s.n_current),
    }
}

fn current_task_mut(s: &mut SchedulerState) -> &mut Task {
    let n_current = s.n_current;
    match s.slots[n_current].as_deref_mut() {
        Some(task) => task,
        None => crate::fatal!(LOG_TARGET, "current task slot {} is empty", n_current),
    }
}

/// Resets the scheduler and installs the bootstrap "Main" task.
///
/// The context this is called from becomes the Main task: it occupies slot
/// 0, is the initial current task, and keeps running on the boot stack.
pub fn init() {
    with_sched(|s| {
        *s = SchedulerState::new();
        s.slots[0] = Some(Task::new_main());
        s.n_tasks = 1;
        s.n_current = 0;
        s.initialized = true;
    });

    SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN.store(false, Ordering::Release);
}

/// Creates a task, registers it, and makes it eligible for selection.
pub fn spawn(name: &str, entry: TaskFn) -> Result<usize, SpawnError> {
    if !with_sched(|s| s.initialized) {
        return Err(SpawnError::NotInitialized);
    }

    let task = Task::new(name, entry)?;
    let index = add_task(task);
    mark_ready_for_scheduling(index);
    Ok(index)
}

/// Registers a task control block in the table.
///
/// The task goes into the first empty slot of the valid prefix, else it is
/// appended. Exceeding [`MAX_TASKS`] is fatal. While new-task suspension is
/// in force the task is recorded as [`TaskState::New`] instead of its
/// post-construction state.
pub fn add_task(mut task: Box<Task>) -> usize {
    with_sched(|s| {
        if s.suspend_new_tasks > 0 {
            task.set_state(TaskState::New);
        }

        if let Some(index) = (0..s.n_tasks).find(|&i| s.slots[i].is_none()) {
            s.slots[index] = Some(task);
            return index;
        }

        if s.n_tasks >= MAX_TASKS {
            crate::fatal!(LOG_TARGET, "system limit of tasks exceeded");
        }

        let index = s.n_tasks;
        s.slots[index] = Some(task);
        s.n_tasks += 1;
        index
    })
}

/// Completes factory wiring: the task may now be selected.
pub fn mark_ready_for_scheduling(task_index: usize) {
    with_sched(|s| {
        if let Some(task) = s.slots.get_mut(task_index).and_then(Option::as_deref_mut) {
            task.mark_ready_for_scheduling();
        }
    });
}

/// Returns the table index of the currently running task.
pub fn current_index() -> usize {
    with_sched(|s| s.n_current)
}

/// Copies the current task's name into `buffer`, returning the copied length.
pub fn copy_current_task_name(buffer: &mut [u8]) -> usize {
    with_sched(|s| {
        let name = current_task(s).name().as_bytes();
        let len = name.len().min(buffer.len());
        buffer[..len].copy_from_slice(&name[..len]);
        len
    })
}

/// Returns the index of the first task whose name matches exactly.
pub fn get_task(name: &str) -> Option<usize> {
    with_sched(|s| {
        (0..s.n_tasks).find(|&i| {
            s.slots[i]
                .as_deref()
                .is_some_and(|task| task.name() == name)
        })
    })
}

/// Returns whether `task_index` names a registered task.
pub fn is_valid_task(task_index: usize) -> bool {
    with_sched(|s| task_index < s.n_tasks && s.slots[task_index].is_some())
}

/// Returns the current bound of the valid table prefix.
pub fn task_count() -> usize {
    with_sched(|s| s.n_tasks)
}

/// Returns the life-cycle state of the task in `task_index`.
///
/// Primarily intended for integration tests and diagnostics.
pub fn task_state(task_index: usize) -> Option<TaskState> {
    with_sched(|s| s.slots.get(task_index)?.as_deref().map(Task::state))
}

/// Returns the wake deadline of the task in `task_index`.
///
/// Primarily intended for integration tests and diagnostics.
pub fn task_wake_ticks(task_index: usize) -> Option<u32> {
    with_sched(|s| s.slots.get(task_index)?.as_deref().map(Task::wake_ticks))
}

/// Returns a copy of the saved register image of the task in `task_index`.
///
/// Primarily intended for integration tests and diagnostics.
pub fn task_regs(task_index: usize) -> Option<TaskRegisters> {
    with_sched(|s| s.slots.get(task_index)?.as_deref().map(|task| task.regs))
}

/// Moves a registered task into `Sleeping` with the given wake deadline.
///
/// Regular code sleeps the current task through the sleep family; this
/// direct transition is intended for integration tests and diagnostics.
pub fn set_task_sleeping(task_index: usize, wake_ticks: u32) -> bool {
    with_sched(|s| {
        match s.slots.get_mut(task_index).and_then(Option::as_deref_mut) {
            Some(task) => {
                task.set_wake_ticks(wake_ticks);
                task.set_state(TaskState::Sleeping);
                true
            }
            None => false,
        }
    })
}

/// Sets the suspend flag: the task is skipped by selection until resumed.
pub fn suspend_task(task_index: usize) -> bool {
    set_suspend_flag(task_index, true)
}

/// Clears the suspend flag set by [`suspend_task`].
pub fn resume_task(task_index: usize) -> bool {
    set_suspend_flag(task_index, false)
}

fn set_suspend_flag(task_index: usize, suspended: bool) -> bool {
    with_sched(|s| {
        match s.slots.get_mut(task_index).and_then(Option::as_deref_mut) {
            Some(task) => {
                task.set_suspended(suspended);
                true
            }
            None => false,
        }
    })
}

/// Holds back every subsequently added task in [`TaskState::New`].
///
/// Forms a balanced counter with [`resume_new_tasks`].
pub fn suspend_new_tasks() {
    with_sched(|s| s.suspend_new_tasks += 1);
}

/// Balances one [`suspend_new_tasks`] call.
///
/// When the counter returns to zero, every task still in `New` is promoted
/// to `Ready`. An unbalanced call is fatal.
pub fn resume_new_tasks() {
    with_sched(|s| {
        if s.suspend_new_tasks == 0 {
            crate::fatal!(LOG_TARGET, "unbalanced resume_new_tasks");
        }
        s.suspend_new_tasks -= 1;

        if s.suspend_new_tasks == 0 {
            for i in 0..s.n_tasks {
                if let Some(task) = s.slots[i].as_deref_mut() {
                    task.start();
                }
            }
        }
    });
}

/// Registers the handler fired after each context switch.
///
/// At most one handler may ever be registered; a second registration is
/// fatal. The handler runs under the scheduler lock and must not call
/// back into the scheduler.
pub fn register_task_switch_handler(handler: TaskHandler) {
    with_sched(|s| {
        if s.task_switch_handler.is_some() {
            crate::fatal!(LOG_TARGET, "task switch handler already registered");
        }
        s.task_switch_handler = Some(handler);
    });
}

/// Registers the handler fired while reaping each terminated task, before
/// its memory is released.
///
/// At most one handler may ever be registered; a second registration is
/// fatal. The handler runs under the scheduler lock and must not call
/// back into the scheduler.
pub fn register_task_termination_handler(handler: TaskHandler) {
    with_sched(|s| {
        if s.task_termination_handler.is_some() {
            crate::fatal!(LOG_TARGET, "task termination handler already registered");
        }
        s.task_termination_handler = Some(handler);
    });
}

/// Writes a diagnostic table of all registered tasks to `sink`.
pub fn list_tasks(sink: &mut dyn fmt::Write) {
    with_sched(|s| list_tasks_locked(s, sink));
}

/// Best-effort variant of [`list_tasks`] for panic-path diagnostics.
///
/// Returns `false` without writing anything when the calling context
/// already holds the scheduler lock.
pub fn try_list_tasks(sink: &mut dyn fmt::Write) -> bool {
    match SCHED.try_lock() {
        Some(sched) => {
            list_tasks_locked(&sched, sink);
            true
        }
        None => false,
    }
}

fn list_tasks_locked(s: &SchedulerState, sink: &mut dyn fmt::Write) {
    let _ = writeln!(sink, "#  ADDR     STAT  FL NAME");

    for i in 0..s.n_tasks {
        let Some(task) = s.slots[i].as_deref() else {
            continue;
        };

        let state = if i == s.n_current {
            "run"
        } else {
            task.state().mnemonic()
        };

        let _ = writeln!(
            sink,
            "{:02} {:08X} {:<5} {}{} {}",
            i,
            task as *const Task as usize,
            state,
            if task.is_suspended() { 'S' } else { ' ' },
            if task.state() == TaskState::BlockedWithTimeout {
                'T'
            } else {
                ' '
            },
            task.name()
        );
    }
}

/// Cooperative reschedule: hands the CPU to the next runnable task.
pub fn yield_now() {
    // SAFETY:
    // - This requires `unsafe` because inline assembly and privileged CPU instructions are outside Rust's static safety model.
    // - `svc #1` (the task-switch trap) saves this context on the supervisor
    //   stack and re-enters through the context-switch return path.
    unsafe {
        asm!("svc #1", clobber_abi("C"));
    }
}

/// Sleeps the current task for at least `seconds`.
pub fn sleep(seconds: u32) {
    // Chunked so the tick delta stays safe when compared as signed 32-bit.
    let mut remaining = seconds;
    while remaining > SLEEP_MAX_SECONDS {
        us_sleep(SLEEP_MAX_SECONDS * 1_000_000);
        remaining -= SLEEP_MAX_SECONDS;
    }
    us_sleep(remaining * 1_000_000);
}

/// Sleeps the current task for at least `ms` milliseconds.
pub fn ms_sleep(ms: u32) {
    if ms > 0 {
        us_sleep(ms * 1000);
    }
}

/// Sleeps the current task for at least `us` microseconds.
pub fn us_sleep(us: u32) {
    us_sleep_with(us, yield_now);
}

/// Sleep core with an injectable yield.
///
/// `yield_once` must provide one scheduling opportunity. Exposed so the
/// sleep contract is testable without real interrupt-driven context
/// switches; production callers use [`us_sleep`].
pub fn us_sleep_with(us: u32, mut yield_once: impl FnMut()) {
    if us == 0 {
        return;
    }

    with_sched(|s| {
        let ticks = us * (CLOCKHZ / 1_000_000);
        let start_ticks = current_ticks();

        let task = current_task_mut(s);
        assert!(
            task.state() == TaskState::Ready,
            "only a running task can put itself to sleep"
        );
        task.set_wake_ticks(start_ticks.wrapping_add(ticks));
        task.set_state(TaskState::Sleeping);
    });

    yield_once();

    with_sched(|s| {
        assert!(
            current_task(s).state() == TaskState::Ready,
            "sleeping task resumed in a non-ready state"
        );
    });
}

/// Parks the current task on `list` until woken or timed out.
///
/// With `us_timeout == 0` the task blocks without a deadline. Returns
/// `true` when the wake was a timeout expiry, `false` when the event was
/// delivered by [`wake_all`].
pub fn block_on(list: &WaitList, us_timeout: u32) -> bool {
    block_on_with(list, us_timeout, yield_now)
}

/// Block core with an injectable yield.
///
/// `yield_once` must provide one scheduling opportunity. Exposed so the
/// block/wake contract is testable without real interrupt-driven context
/// switches; production callers use [`block_on`].
pub fn block_on_with(list: &WaitList, us_timeout: u32, mut yield_once: impl FnMut()) -> bool {
    with_sched(|s| {
        let head = list.head_cell();
        let task = current_task_mut(s);
        assert!(
            task.wait_next.is_null(),
            "task is already linked on a wait list"
        );
        assert!(
            task.state() == TaskState::Ready,
            "only a running task can block itself"
        );

        let task_ptr = task as *mut Task;
        // SAFETY:
        // - `head` and the linked TCBs are only touched under the scheduler
        //   lock, which is held for this whole closure.
        unsafe {
            (*task_ptr).wait_next = *head;
            *head = task_ptr;
        }

        if us_timeout == 0 {
            // No deadline: a non-zero marker makes any wake read as an
            // event delivery.
            task.set_wake_ticks(WAKE_EVENT_PENDING);
            task.set_state(TaskState::Blocked);
        } else {
            let ticks = us_timeout * (CLOCKHZ / 1_000_000);
            let start_ticks = current_ticks();
            task.set_wake_ticks(start_ticks.wrapping_add(ticks));
            task.set_state(TaskState::BlockedWithTimeout);
        }
    });

    yield_once();

    with_sched(|s| {
        let head = list.head_cell();
        let task_ptr = current_task_mut(s) as *mut Task;

        // A timeout wake leaves the task on the list; splice it out. An
        // explicit wake already detached the whole list and this walk is a
        // no-op.
        // SAFETY:
        // - All linkage is owned by scheduler-registered TCBs and only
        //   touched under the scheduler lock.
        unsafe {
            let mut prev: *mut Task = core::ptr::null_mut();
            let mut p = *head;
            while !p.is_null() {
                if p == task_ptr {
                    if prev.is_null() {
                        *head = (*p).wait_next;
                    } else {
                        (*prev).wait_next = (*p).wait_next;
                    }
                }
                prev = p;
                p = (*p).wait_next;
            }
            (*task_ptr).wait_next = core::ptr::null_mut();
        }

        // Zero means the selection pass woke us by expiring the deadline.
        current_task(s).wake_ticks() == 0
    })
}

/// Wakes every task parked on `list`.
///
/// The whole list is detached atomically; all member tasks become `Ready`
/// before any of them runs. Waking a task that is not blocked is fatal.
/// Wake deadlines are left untouched so a timed blocker can tell an event
/// delivery from a timeout on return.
pub fn wake_all(list: &WaitList) {
    with_sched(|_s| {
        let head = list.head_cell();

        // SAFETY:
        // - The linkage is only touched under the scheduler lock.
        unsafe {
            let mut p = *head;
            *head = core::ptr::null_mut();

            while !p.is_null() {
                let task = &mut *p;
                match task.state() {
                    TaskState::Blocked | TaskState::BlockedWithTimeout => {}
                    _ => crate::fatal!(LOG_TARGET, "tried to wake non-blocked task"),
                }
                task.set_state(TaskState::Ready);

                let next = task.wait_next;
                task.wait_next = core::ptr::null_mut();
                p = next;
            }
        }
    });
}

/// Marks the current task `Terminated` and requests a reschedule.
///
/// The task keeps its slot and stack until the next selection pass, because
/// it cannot free the stack it is still running on.
pub fn terminate_current() {
    with_sched(|s| {
        current_task_mut(s).set_state(TaskState::Terminated);
    });
    SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN.store(true, Ordering::Release);
}

/// Terminates the current task and hands the CPU away for good.
pub fn exit_current_task() -> ! {
    terminate_current();
    loop {
        yield_now();
    }
}

/// Runs one selection pass and returns the chosen table index, or
/// [`MAX_TASKS`] when nothing is runnable right now.
///
/// The pass also reaps terminated tasks and compacts the table; see
/// [`get_next_task_locked`] for the algorithm.
pub fn get_next_task() -> usize {
    with_sched(get_next_task_locked)
}

/// Selection algorithm, executed under the scheduler lock:
///
/// 1. verify that no slot beyond the valid prefix is occupied,
/// 2. reap terminated tasks (except the current one), counting holes,
/// 3. compact the table when at least half of the prefix is empty,
/// 4. round-robin scan starting after the current slot, waking expired
///    sleepers and timed-out blockers on the way.
fn get_next_task_locked(s: &mut SchedulerState) -> usize {
    for i in s.n_tasks..MAX_TASKS {
        if s.slots[i].is_some() {
            crate::fatal!(
                LOG_TARGET,
                "task slot {} beyond the table prefix is occupied",
                i
            );
        }
    }

    let termination_handler = s.task_termination_handler;
    let mut removed = 0usize;
    for i in 0..s.n_tasks {
        let reap = match s.slots[i].as_deref() {
            None => {
                removed += 1;
                false
            }
            Some(task) => task.state() == TaskState::Terminated && i != s.n_current,
        };

        if reap {
            let task = match s.slots[i].take() {
                Some(task) => task,
                None => crate::fatal!(LOG_TARGET, "reaped slot {} emptied concurrently", i),
            };
            if !task.wait_next.is_null() {
                crate::fatal!(LOG_TARGET, "reaping task still linked on a wait list");
            }
            if let Some(handler) = termination_handler {
                handler(&task);
            }
            // Dropping the box releases the TCB and its stack.
            drop(task);
            removed += 1;
        }
    }

    if removed >= s.n_tasks / 2 {
        let old_current = s.n_current;
        let mut kept = 0usize;
        for i in 0..s.n_tasks {
            if s.slots[i].is_none() {
                continue;
            }
            if kept != i {
                s.slots[kept] = s.slots[i].take();
            }
            if i == old_current {
                s.n_current = kept;
            }
            kept += 1;
        }
        s.n_tasks = kept;
    }

    let n_current = s.n_current;
    let now = current_ticks();
    let mut cursor = if n_current < MAX_TASKS { n_current } else { 0 };

    for _ in 1..=s.n_tasks {
        cursor += 1;
        if cursor >= s.n_tasks {
            cursor = 0;
        }

        let Some(task) = s.slots[cursor].as_deref_mut() else {
            continue;
        };

        // A task whose saved PC still points at the entry trampoline and
        // whose factory wiring is unfinished is not yet runnable.
        if task.regs.pc == task_entry_pc() && !task.is_ready_for_scheduling() {
            continue;
        }

        if task.is_suspended() {
            continue;
        }

        match task.state() {
            TaskState::Ready => return cursor,

            TaskState::Blocked | TaskState::New => continue,

            TaskState::BlockedWithTimeout => {
                if (task.wake_ticks().wrapping_sub(now) as i32) > 0 {
                    continue;
                }
                task.set_state(TaskState::Ready);
                // Zeroed deadline doubles as the timeout-expired flag read
                // back by `block_on`.
                task.set_wake_ticks(0);
                return cursor;
            }

            TaskState::Sleeping => {
                if (task.wake_ticks().wrapping_sub(now) as i32) > 0 {
                    continue;
                }
                task.set_state(TaskState::Ready);
                return cursor;
            }

            TaskState::Terminated => {
                // The reap pass removed every terminated task except the
                // current one.
                if cursor != n_current {
                    crate::fatal!(
                        LOG_TARGET,
                        "terminated task in slot {} survived the reap pass",
                        cursor
                    );
                }
            }
        }
    }

    MAX_TASKS
}

/// Context switch on the trap-stub return path.
///
/// Selects the next task (retrying until one is runnable), then persists
/// the stub-saved register image into the outgoing TCB and overwrites the
/// image with the incoming TCB's context, so the stub resumes the new task.
/// Returns without touching the image when the selection lands on the
/// current task.
pub fn context_switch_on_irq_return(regs_saved_by_irq_stub: *mut TaskRegisters) {
    SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN.store(false, Ordering::Release);

    loop {
        let switched = with_sched(|s| {
            let next = get_next_task_locked(s);
            if next == MAX_TASKS {
                // At least the Main task always exists, so a runnable task
                // eventually appears (a sleeper's deadline keeps advancing
                // toward `now` even with IRQs masked).
                assert!(s.n_tasks > 0, "scheduler selection with empty task table");
                return false;
            }

            if next == s.n_current {
                return true;
            }

            // SAFETY:
            // - The stub's image address stays valid for this whole trap
            //   invocation and is not aliased by any task.
            let stub_regs = unsafe { &mut *regs_saved_by_irq_stub };

            let outgoing = s.n_current;
            match s.slots[outgoing].as_deref_mut() {
                Some(task) => task.regs = *stub_regs,
                None => crate::fatal!(LOG_TARGET, "current task slot {} is empty", outgoing),
            }

            s.n_current = next;
            let switch_handler = s.task_switch_handler;
            let incoming = match s.slots[next].as_deref_mut() {
                Some(task) => task,
                None => crate::fatal!(LOG_TARGET, "selected task slot {} is empty", next),
            };
            *stub_regs = incoming.regs;

            if let Some(handler) = switch_handler {
                handler(incoming);
            }
            true
        });

        if switched {
            break;
        }
        core::hint::spin_loop();
    }
}

// --- Preemptive multitasking -------------------------------------------

/// Set by the periodic tick handler; the trap stubs consult it on their
/// return path and invoke [`context_switch_on_irq_return`] iff set.
static SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN: AtomicBool = AtomicBool::new(false);

/// Periodic tick of the most recent forced context switch.
static TICK_OF_LAST_CONTEXT_SWITCH: AtomicU32 = AtomicU32::new(0);

/// One-tick time slice: arms the switch flag whenever the interrupted task
/// has used up a full timer period since the last forced switch.
fn time_slice_tick_handler() {
    let current_tick = timer::ticks();
    if current_tick.wrapping_sub(TICK_OF_LAST_CONTEXT_SWITCH.load(Ordering::Relaxed)) >= 1 {
        SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN.store(true, Ordering::Release);
        TICK_OF_LAST_CONTEXT_SWITCH.store(current_tick, Ordering::Relaxed);
    } else {
        SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN.store(false, Ordering::Release);
    }
}

/// Enables timer-driven preemption with a one-tick time slice.
pub fn enable_preemptive_multitasking() {
    SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN.store(false, Ordering::Release);
    TICK_OF_LAST_CONTEXT_SWITCH.store(timer::ticks(), Ordering::Relaxed);
    timer::register_periodic_handler(time_slice_tick_handler);
}

/// Whether the trap-stub return path must perform a context switch.
pub fn should_switch_on_irq_return() -> bool {
    SHOULD_CONTEXT_SWITCH_ON_IRQ_RETURN.load(Ordering::Acquire)
}
