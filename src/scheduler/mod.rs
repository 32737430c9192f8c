//! Scheduler module facade.
//!
//! The task control block lives in `task.rs`, the scheduler core in
//! `roundrobin.rs`; both are re-exported here so `crate::scheduler::*`
//! call sites stay clean.

mod roundrobin;
mod task;

pub mod demotasks;

pub use roundrobin::*;
pub use task::{SpawnError, Task, TaskFn, TaskState, TASK_STACK_SIZE};
