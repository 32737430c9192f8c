//! Scheduler demo tasks and demo entrypoint.
//!
//! Three tasks exercise the scheduler surface end to end: a ticker that
//! sleeps, a consumer that parks on a wait list with a timeout, and a
//! producer that signals the list. Their interleaved UART output makes
//! task switching visible on the serial console.

use crate::arch::interrupts;
use crate::debugln;
use crate::sync::waitlist::WaitList;

use super::roundrobin::{
    block_on, enable_preemptive_multitasking, ms_sleep, spawn, wake_all, yield_now,
};

/// Event the consumer parks on and the producer signals.
static DEMO_EVENT: WaitList = WaitList::new();

extern "C" fn ticker_task() {
    let mut beats = 0u32;
    loop {
        ms_sleep(500);
        beats += 1;
        debugln!("[ticker] beat {}", beats);
    }
}

extern "C" fn consumer_task() {
    loop {
        let timed_out = block_on(&DEMO_EVENT, 2_000_000);
        if timed_out {
            debugln!("[consumer] timed out waiting for the event");
        } else {
            debugln!("[consumer] event delivered");
        }
    }
}

extern "C" fn producer_task() {
    loop {
        ms_sleep(750);
        wake_all(&DEMO_EVENT);
    }
}

/// Spawns the demo tasks and switches on preemption.
///
/// Keep IRQs masked from spawn to enable: the periodic tick must not
/// preempt into a half-built task set.
pub fn start_demo() {
    interrupts::disable();

    spawn("ticker", ticker_task).expect("demo: spawn ticker failed");
    spawn("consumer", consumer_task).expect("demo: spawn consumer failed");
    spawn("producer", producer_task).expect("demo: spawn producer failed");

    enable_preemptive_multitasking();

    interrupts::enable();

    // Hand the CPU over once; preemption keeps the rotation going.
    yield_now();
}
