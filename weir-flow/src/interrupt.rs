//! Cooperative interruption.
//!
//! Interruption is a signal, not preemption: firing an interrupt runs
//! the registered cleanups and then raises
//! [`Condition::Interrupted`](weir_kernel::Condition) into the target's
//! continuation chain on the next tick. Whatever the target was blocked
//! on keeps running; only the continuation wiring learns about the
//! cancellation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use weir_kernel::{raise, Action, Condition, DurationMs, Orch, Value};

type Cleanup = Box<dyn FnOnce()>;

struct InterruptState {
    cleanups: RefCell<Vec<Cleanup>>,
    done: Cell<bool>,
    site: RefCell<Option<(Orch, Value, Action)>>,
}

/// Registration handle passed to an [`interruptible`] builder.
pub struct InterruptGuard {
    state: Rc<InterruptState>,
}

impl InterruptGuard {
    /// Register a cleanup. Cleanups run in installation order, exactly
    /// once, when the interrupt fires before completion.
    pub fn on_interrupt(&self, cleanup: impl FnOnce() + 'static) {
        self.state.cleanups.borrow_mut().push(Box::new(cleanup));
    }
}

/// An interruptible producer: the guarded action and its interrupt.
pub struct Interruptible {
    /// The guarded action.
    pub action: Action,
    /// Runs the cleanups and raises `interrupted` into the guarded
    /// action's continuation chain. A no-op once the action completed.
    pub interrupt: Action,
}

/// Build an interruptible action.
///
/// The builder receives a registration handle and returns the low-level
/// action to guard. The returned [`Interruptible`] pairs that action
/// with an `interrupt` action that can run in any orchestrator.
pub fn interruptible(builder: impl FnOnce(&InterruptGuard) -> Action) -> Interruptible {
    let state = Rc::new(InterruptState {
        cleanups: RefCell::new(Vec::new()),
        done: Cell::new(false),
        site: RefCell::new(None),
    });
    let inner = builder(&InterruptGuard {
        state: state.clone(),
    });

    let action = {
        let state = state.clone();
        Action::native("interruptible", move |m, input, success, failure| {
            *state.site.borrow_mut() = Some((m.clone(), input.clone(), failure.clone()));
            let ok = settle(&state, &success);
            let err = settle(&state, &failure);
            m.call(&inner, input, Some(ok), Some(err));
        })
    };

    let interrupt = {
        let state = state.clone();
        Action::native("interruptible.interrupt", move |m, input, success, _f| {
            if !state.done.replace(true) {
                let cleanups: Vec<Cleanup> = state.cleanups.borrow_mut().drain(..).collect();
                for cleanup in cleanups {
                    cleanup();
                }
                if let Some((orch, at_input, failure)) = state.site.borrow_mut().take() {
                    orch.delay(
                        DurationMs::ZERO,
                        &raise(Condition::Interrupted),
                        at_input,
                        None,
                        Some(failure),
                    );
                }
            }
            m.call(&success, input, None, None);
        })
    };

    Interruptible { action, interrupt }
}

fn settle(state: &Rc<InterruptState>, k: &Action) -> Action {
    let state = state.clone();
    let k = k.clone();
    Action::native("interruptible.settle", move |m, v, _s, _f| {
        if !state.done.replace(true) {
            state.site.borrow_mut().take();
            m.call(&k, v, None, None);
        }
    })
}

/// A fan-out interruption handle.
pub struct Interruption {
    /// Registers the running sequence with the handle and proceeds.
    pub mark: Action,
    /// Raises the handle's reason into every marked sequence.
    pub interrupt: Action,
}

/// Build a `{mark, interrupt}` pair over a shared handler table.
///
/// Any number of independent sequences run `mark`; firing `interrupt`
/// raises `reason` into each of them, once — the table is cleared as it
/// fires, so firing twice is the same as firing once.
pub fn interruption(reason: impl Into<Value>) -> Interruption {
    let reason = reason.into();
    let handlers: Rc<RefCell<Vec<(Orch, Value, Action)>>> = Rc::new(RefCell::new(Vec::new()));

    let mark = {
        let handlers = handlers.clone();
        Action::native("interruption.mark", move |m, input, success, failure| {
            handlers.borrow_mut().push((m.clone(), input.clone(), failure.clone()));
            m.call(&success, input, None, None);
        })
    };

    let interrupt = {
        let handlers = handlers.clone();
        Action::native("interruption.interrupt", move |m, input, success, _f| {
            let fired: Vec<(Orch, Value, Action)> = handlers.borrow_mut().drain(..).collect();
            for (orch, at_input, failure) in fired {
                orch.delay(
                    DurationMs::ZERO,
                    &raise(reason.clone()),
                    at_input,
                    None,
                    Some(failure),
                );
            }
            m.call(&success, input, None, None);
        })
    };

    Interruption { mark, interrupt }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;
    use weir_kernel::test_utils::Recorder;
    use weir_kernel::{chain, pass, Orch};

    #[tokio::test(start_paused = true)]
    async fn interrupt_runs_cleanups_in_order_and_raises() {
        let cleanups = Rc::new(RefCell::new(Vec::new()));
        let errs = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let cleanups = cleanups.clone();
            let errs = errs.clone();
            async move {
                let m = Orch::new();
                let guarded = interruptible(|g| {
                    for tag in ["first", "second"] {
                        let cleanups = cleanups.clone();
                        g.on_interrupt(move || cleanups.borrow_mut().push(tag));
                    }
                    // Parks forever: never invokes a continuation.
                    Action::native("stuck", |_m, _input, _s, _f| {})
                });
                m.call(&guarded.action, Value::from("job"), None, Some(errs.sink()));
                m.run(Value::Nothing, &guarded.interrupt);
            }
        });
        local.await;
        assert_eq!(cleanups.borrow().as_slice(), &["first", "second"]);
        let seen = errs.values();
        let err = seen[0].as_error().expect("an IoError");
        assert_eq!(err.payload(), Value::from(Condition::Interrupted));
        assert_eq!(err.input(), Value::from("job"));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_twice_is_interrupt_once() {
        let runs = Rc::new(Cell::new(0));
        let errs = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let runs = runs.clone();
            let errs = errs.clone();
            async move {
                let m = Orch::new();
                let guarded = interruptible(|g| {
                    let runs = runs.clone();
                    g.on_interrupt(move || runs.set(runs.get() + 1));
                    Action::native("stuck", |_m, _input, _s, _f| {})
                });
                m.call(&guarded.action, Value::Nothing, None, Some(errs.sink()));
                m.run(Value::Nothing, &guarded.interrupt);
                m.run(Value::Nothing, &guarded.interrupt);
            }
        });
        local.await;
        assert_eq!(runs.get(), 1);
        assert_eq!(errs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_after_completion_is_a_no_op() {
        let runs = Rc::new(Cell::new(0));
        let rec = Recorder::new();
        let errs = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let runs = runs.clone();
            let rec = rec.clone();
            let errs = errs.clone();
            async move {
                let m = Orch::new();
                let guarded = interruptible(|g| {
                    let runs = runs.clone();
                    g.on_interrupt(move || runs.set(runs.get() + 1));
                    pass()
                });
                m.call(&guarded.action, Value::from(1i64), Some(rec.sink()), Some(errs.sink()));
                m.run(Value::Nothing, &guarded.interrupt);
            }
        });
        local.await;
        assert_eq!(rec.values(), vec![Value::from(1i64)]);
        assert_eq!(runs.get(), 0, "cleanups do not run after completion");
        assert!(errs.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interruption_fans_out_to_every_marked_sequence() {
        let errs = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let errs = errs.clone();
            async move {
                let m = Orch::new();
                let handle = interruption("evacuate");
                for job in ["a", "b"] {
                    let a = chain(vec![handle.mark.clone(), Action::native("stuck", |_m, _i, _s, _f| {})]);
                    m.call(&a, Value::from(job), None, Some(errs.sink()));
                }
                m.run(Value::Nothing, &handle.interrupt);
                m.run(Value::Nothing, &handle.interrupt);
            }
        });
        local.await;
        assert_eq!(errs.len(), 2, "both sequences interrupted, exactly once");
        for fault in errs.values() {
            let err = fault.as_error().expect("an IoError");
            assert_eq!(err.payload(), Value::from("evacuate"));
        }
    }
}
