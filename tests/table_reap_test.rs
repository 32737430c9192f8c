//! Task-table reaping and compaction integration tests.
//!
//! Tasks die the way they do in production: the context switch path moves
//! the CPU onto a task, and that task exits itself, either through the
//! Exit system call or through the scheduler's cooperative exit entry.
//! The tests then drive selection passes and watch the corpse get reaped.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(piko_kernel::testing::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicUsize, Ordering};

use piko_kernel::arch::interrupts::TaskRegisters;
use piko_kernel::scheduler::{self as sched, TaskState, MAX_TASKS};
use piko_kernel::syscall::{self, SyscallId, SYSCALL_OK};

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

extern "C" fn dummy_task() {
    loop {
        core::hint::spin_loop();
    }
}

static TERMINATION_HOOK_FIRED: AtomicUsize = AtomicUsize::new(0);

fn record_task_termination(_task: &sched::Task) {
    TERMINATION_HOOK_FIRED.fetch_add(1, Ordering::Relaxed);
}

/// Drives context switches until the task in `target` owns the CPU.
///
/// Each switch runs a full selection pass, so reaping and compaction can
/// happen along the way, exactly as on hardware.
fn rotate_cpu_to(target: usize, stub: &mut TaskRegisters) {
    for _ in 0..MAX_TASKS {
        if sched::current_index() == target {
            return;
        }
        sched::context_switch_on_irq_return(stub);
    }
    panic!("could not rotate the CPU to slot {}", target);
}

/// Contract: a task that exits through syscall 4 is reaped exactly once,
/// leaving a hole that does not yet shrink the table.
/// Given: Main plus three spawned tasks, with the termination hook armed.
/// When: The CPU rotates onto task B, B issues the Exit system call, the
/// CPU moves away, and a selection pass runs.
/// Then: The hook fires once, the slot is empty, and `n_tasks` is
/// unchanged because fewer than half of the prefix was removed.
#[test_case]
fn test_reap_after_exit_syscall_leaves_hole_until_compaction() {
    sched::init();
    TERMINATION_HOOK_FIRED.store(0, Ordering::Relaxed);
    sched::register_task_termination_handler(record_task_termination);

    let _task_a = sched::spawn("task-a", dummy_task).expect("task A should spawn");
    let task_b = sched::spawn("task-b", dummy_task).expect("task B should spawn");
    let task_c = sched::spawn("task-c", dummy_task).expect("task C should spawn");

    let mut stub = TaskRegisters::default();
    rotate_cpu_to(task_b, &mut stub);

    // Task B exits itself through the wire contract.
    let raw = syscall::dispatch(SyscallId::Exit as u32, 0, 0, 0, 0);
    assert!(raw == SYSCALL_OK, "Exit must report 0 on the wire");
    assert!(
        sched::task_state(task_b) == Some(TaskState::Terminated),
        "the exiting task must be marked Terminated"
    );

    // The pass that moves the CPU away must not reap the exiting task:
    // it is still the current task, running on its own stack.
    sched::context_switch_on_irq_return(&mut stub);
    assert!(sched::current_index() == task_c, "task C must take the CPU");
    assert!(
        sched::task_state(task_b) == Some(TaskState::Terminated),
        "the ex-current task survives the pass that switched away from it"
    );
    assert!(
        TERMINATION_HOOK_FIRED.load(Ordering::Relaxed) == 0,
        "the hook must not fire before the task is reaped"
    );

    let next = sched::get_next_task();
    assert!(next != task_b, "a terminated task must never be selected");
    assert!(
        TERMINATION_HOOK_FIRED.load(Ordering::Relaxed) == 1,
        "termination hook must fire exactly once"
    );
    assert!(
        sched::task_state(task_b).is_none(),
        "the reaped slot must be empty"
    );
    assert!(
        sched::task_count() == 4,
        "one hole out of four slots must not trigger compaction"
    );

    // A second pass must not reap (or report) the same task again.
    let _ = sched::get_next_task();
    assert!(
        TERMINATION_HOOK_FIRED.load(Ordering::Relaxed) == 1,
        "reaping must be idempotent per task"
    );
}

/// Contract: once holes plus fresh corpses cover half of the prefix, the
/// table compacts and the current-task cursor is rewritten.
/// Given: Eight tasks; the tasks in slots 1, 3, 5, 7 exit themselves one
/// at a time, leaving holes that accumulate across passes.
/// When: The final selection pass reaps the last corpse, pushing the
/// removed count to half the prefix.
/// Then: Survivors occupy slots 0..4 in order, the current index follows
/// its task to the compacted slot, and the vacated tail is empty.
#[test_case]
fn test_compaction_left_shifts_survivors_and_rewrites_current() {
    sched::init();

    let names = ["t1", "t2", "t3", "t4", "t5", "t6", "t7"];
    for name in names {
        sched::spawn(name, dummy_task).expect("spawn should succeed");
    }
    assert!(sched::task_count() == 8, "table must hold Main plus seven tasks");

    let mut stub = TaskRegisters::default();

    // The first three victims exit one at a time. Each later rotation
    // reaps the previous corpse, so holes pile up without compacting.
    for victim in [1, 3, 5] {
        rotate_cpu_to(victim, &mut stub);
        sched::terminate_current();
        sched::context_switch_on_irq_return(&mut stub);
    }

    rotate_cpu_to(7, &mut stub);
    sched::terminate_current();

    // Park Main so the CPU lands on t2, a survivor that compaction moves.
    sched::suspend_task(0);
    sched::context_switch_on_irq_return(&mut stub);
    assert!(
        sched::current_index() == 2,
        "setup must land the CPU on t2 in slot 2"
    );

    // Three holes plus the corpse in slot 7 reach 8/2: this pass compacts.
    let _ = sched::get_next_task();

    assert!(sched::task_count() == 4, "four survivors must remain");
    assert!(
        sched::current_index() == 1,
        "the current index must follow its task to the compacted slot"
    );
    assert!(
        sched::get_task("t2") == Some(1)
            && sched::get_task("t4") == Some(2)
            && sched::get_task("t6") == Some(3),
        "survivors must keep their relative order"
    );
    assert!(
        !sched::is_valid_task(4) && !sched::is_valid_task(7),
        "the vacated tail must be empty"
    );

    sched::resume_task(0);
}

/// Contract: the current task survives its own termination for one pass.
/// Given: Main (current) exits cooperatively while another task is ready.
/// When: Selection passes run before and after the CPU moves away.
/// Then: The first pass skips reaping Main, the next pass reaps it.
#[test_case]
fn test_terminated_current_task_survives_one_pass() {
    sched::init();

    let task_a = sched::spawn("task-a", dummy_task).expect("task A should spawn");

    sched::terminate_current();

    let next = sched::get_next_task();
    assert!(next == task_a, "the other ready task must be selected");
    assert!(
        sched::task_state(0) == Some(TaskState::Terminated),
        "the current task cannot reap itself"
    );

    // Move the CPU off the terminated task, then reap it.
    let mut stub = TaskRegisters::default();
    sched::context_switch_on_irq_return(&mut stub);
    assert!(sched::current_index() == task_a, "task A must take the CPU");

    let _ = sched::get_next_task();
    assert!(
        sched::task_state(0).is_none(),
        "the terminated ex-current task must be reaped on the next pass"
    );
}

/// Contract: registration reuses the first hole in the table prefix.
/// Given: A task exits itself and its slot is reaped.
/// When: A new task is spawned.
/// Then: It lands in the hole, not at the end of the table.
#[test_case]
fn test_spawn_reuses_reaped_slot() {
    sched::init();

    let task_a = sched::spawn("task-a", dummy_task).expect("task A should spawn");
    let _task_b = sched::spawn("task-b", dummy_task).expect("task B should spawn");
    let _task_c = sched::spawn("task-c", dummy_task).expect("task C should spawn");

    let mut stub = TaskRegisters::default();
    rotate_cpu_to(task_a, &mut stub);
    sched::terminate_current();
    sched::context_switch_on_irq_return(&mut stub);

    let _ = sched::get_next_task();
    assert!(sched::task_state(task_a).is_none(), "slot must be reaped");

    let task_d = sched::spawn("task-d", dummy_task).expect("task D should spawn");
    assert!(
        task_d == task_a,
        "registration must fill the first hole in the prefix"
    );
    assert!(sched::task_count() == 4, "the table must not grow past the hole");
}
