//! Serialized entry with bounded buffering.
//!
//! `atomic` admits one invocation of its action at a time. Arrivals
//! while busy queue up to the orchestrator's `buffer_capacity`; past
//! that, the arrival is refused with a shared [`PauseSignal`] instead of
//! being enqueued — the upstream generator traps it and parks. When a
//! run completes, the next queued item is dispatched first, then the
//! pause (if any) is resumed once the queue has drained below capacity,
//! and only then is the finished result delivered onward.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use weir_kernel::{chain, Action, Orch, PauseSignal, Value};

struct AtomicState {
    busy: Cell<bool>,
    waiters: RefCell<VecDeque<(Value, Action, Action)>>,
    pause: RefCell<Option<PauseSignal>>,
}

/// Serialize entries into `action` through a bounded waiter queue.
///
/// All invocations of the returned action share one queue, so multiple
/// producers pumping into the same `atomic` are serialized together,
/// each with its own result routing.
pub fn atomic(action: Action) -> Action {
    let state = Rc::new(AtomicState {
        busy: Cell::new(false),
        waiters: RefCell::new(VecDeque::new()),
        pause: RefCell::new(None),
    });
    Action::native("atomic", move |m, input, success, failure| {
        if !state.busy.get() {
            state.busy.set(true);
            dispatch(m, &state, &action, input, success, failure);
            return;
        }
        let capacity = m.config().buffer_capacity;
        if state.waiters.borrow().len() + 1 >= capacity {
            let p = state
                .pause
                .borrow_mut()
                .get_or_insert_with(PauseSignal::new)
                .clone();
            m.call(&failure, Value::Pause(p), None, None);
        } else {
            state.waiters.borrow_mut().push_back((input, success, failure));
        }
    })
}

fn dispatch(
    m: &Orch,
    state: &Rc<AtomicState>,
    action: &Action,
    input: Value,
    success: Action,
    failure: Action,
) {
    let ok = completion(state, action, success);
    let err = completion(state, action, failure);
    m.call(action, input, Some(ok), Some(err));
}

fn completion(state: &Rc<AtomicState>, action: &Action, deliver: Action) -> Action {
    let state = state.clone();
    let action = action.clone();
    Action::native("atomic.done", move |m, outcome, _s, _f| {
        let next = state.waiters.borrow_mut().pop_front();
        match next {
            Some((input, success, failure)) => {
                dispatch(m, &state, &action, input, success, failure);
            }
            None => state.busy.set(false),
        }
        let capacity = m.config().buffer_capacity;
        if state.waiters.borrow().len() + 1 < capacity {
            let resumable = state.pause.borrow_mut().take();
            if let Some(p) = resumable {
                p.resume();
            }
        }
        m.call(&deliver, outcome, None, None);
    })
}

/// A shared pipeline: every stage independently serialized, so several
/// producers can pump through it with per-input result routing.
pub fn pipeline(stages: Vec<Action>) -> Action {
    chain(stages.into_iter().map(atomic).collect())
}
