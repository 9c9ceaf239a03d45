//! Timer-driven combinators.
//!
//! `delay` shifts a delivery, `debounce` collapses activation storms
//! into the last one, and `clock` turns a control input into a periodic
//! tick stream. All three ride the kernel scheduler; none of them
//! throttles its downstream — the clock in particular trusts the caller
//! to finish each tick within the period.

use std::cell::Cell;
use std::rc::Rc;
use weir_kernel::{sched, Action, DurationMs, Orch, Value};

/// Pass the input through after `wait`.
pub fn delay(wait: impl Into<DurationMs>) -> Action {
    let wait = wait.into();
    Action::native("delay", move |m, input, success, _f| {
        m.delay(wait, &success, input, None, None);
    })
}

/// Forward the latest activation once `wait` has passed without a newer
/// one. Every activation restarts the clock and supersedes the pending
/// delivery.
pub fn debounce(wait: impl Into<DurationMs>) -> Action {
    let wait = wait.into();
    let generation = Rc::new(Cell::new(0u64));
    Action::native("debounce", move |m, input, success, _f| {
        let id = generation.get() + 1;
        generation.set(id);
        let generation = generation.clone();
        let m = m.clone();
        sched::after(wait, move || {
            if generation.get() == id {
                m.call(&success, input, None, None);
            }
        });
    })
}

struct ClockState {
    running: Cell<bool>,
    count: Cell<u64>,
    epoch: Cell<u64>,
}

/// A periodic tick source driven by control inputs.
///
/// `"start"` begins delivering `ticks(0)`, `ticks(1)`, … to the success
/// continuation captured at start, one per period. `"stop"` halts;
/// `"reset"` zeroes the counter for the next tick; anything else is
/// ignored. Control inputs themselves flow nowhere — only ticks go
/// downstream.
pub fn clock(period: impl Into<DurationMs>, ticks: impl Fn(u64) -> Value + 'static) -> Action {
    let period = period.into();
    let ticks: Rc<dyn Fn(u64) -> Value> = Rc::new(ticks);
    let state = Rc::new(ClockState {
        running: Cell::new(false),
        count: Cell::new(0),
        epoch: Cell::new(0),
    });
    Action::native("clock", move |m, input, success, _f| {
        match input.as_str() {
            Some("start") => {
                if state.running.get() {
                    return;
                }
                state.running.set(true);
                let epoch = state.epoch.get() + 1;
                state.epoch.set(epoch);
                schedule_tick(m, state.clone(), period, ticks.clone(), epoch, success);
            }
            Some("stop") => state.running.set(false),
            Some("reset") => state.count.set(0),
            _ => {}
        }
    })
}

fn schedule_tick(
    m: &Orch,
    state: Rc<ClockState>,
    period: DurationMs,
    ticks: Rc<dyn Fn(u64) -> Value>,
    epoch: u64,
    success: Action,
) {
    let m = m.clone();
    sched::after(period, move || {
        if !state.running.get() || state.epoch.get() != epoch {
            return;
        }
        let i = state.count.get();
        state.count.set(i + 1);
        m.call(&success, ticks(i), None, None);
        schedule_tick(&m, state, period, ticks, epoch, success);
    });
}
