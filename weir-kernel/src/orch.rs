//! The orchestrator — how actions get called.
//!
//! Every invocation in the system funnels through [`Orch::call`]: missing
//! continuations are normalized to the drain sink, the call is routed
//! through the [`Dispatch`] seam, and the trampoline bounds how deep a
//! synchronous continuation chain may grow before it is broken across a
//! scheduler turn.
//!
//! [`Dispatch`] is the substitution point. Calling code doesn't know
//! which implementation is behind it — the default forwards straight to
//! the trampoline; a tracing decorator logs each call first; a derived
//! orchestrator can interpose whatever per-invocation context it needs.

use crate::action::Action;
use crate::duration::DurationMs;
use crate::sched;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// Orchestrator tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Synchronous call depth at which the trampoline defers to the
    /// next scheduler turn.
    pub max_depth: u32,
    /// Capacity of `atomic` waiter queues, and the burst budget of
    /// generators.
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 50,
            buffer_capacity: 8,
        }
    }
}

/// The dispatch seam.
///
/// Implementations decide what happens around each action invocation and
/// then (normally) forward to [`Orch::invoke`]. Implementations:
///
/// - [`DefaultDispatch`]: forward, nothing else.
/// - `weir-trace`'s `TraceDispatch`: log one structured event per call,
///   then forward to the wrapped dispatcher — identical semantics
///   otherwise.
pub trait Dispatch {
    /// Dispatch one action invocation.
    fn dispatch(&self, orch: &Orch, action: &Action, input: Value, success: Action, failure: Action);
}

/// The plain dispatcher: straight to the trampoline.
#[derive(Debug, Default)]
pub struct DefaultDispatch;

impl Dispatch for DefaultDispatch {
    fn dispatch(&self, orch: &Orch, action: &Action, input: Value, success: Action, failure: Action) {
        orch.invoke(action, input, success, failure);
    }
}

struct OrchState {
    config: Config,
    depth: Cell<u32>,
    dispatch: Rc<dyn Dispatch>,
}

/// The execution engine that calls actions.
///
/// Cheap to clone; clones share the same trampoline state and
/// dispatcher. Derive a child with [`Orch::child`] or substitute the
/// dispatcher with [`Orch::with_dispatch`].
#[derive(Clone)]
pub struct Orch {
    state: Rc<OrchState>,
}

impl Orch {
    /// A fresh orchestrator with default limits.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// A fresh orchestrator with the given limits.
    pub fn with_config(config: Config) -> Self {
        Self {
            state: Rc::new(OrchState {
                config,
                depth: Cell::new(0),
                dispatch: Rc::new(DefaultDispatch),
            }),
        }
    }

    /// The limits in force.
    pub fn config(&self) -> Config {
        self.state.config
    }

    /// The dispatcher in force.
    pub fn dispatcher(&self) -> Rc<dyn Dispatch> {
        Rc::clone(&self.state.dispatch)
    }

    /// A derived orchestrator with the given dispatcher and this one's
    /// limits. The derived instance has its own trampoline counter.
    pub fn with_dispatch(&self, dispatch: Rc<dyn Dispatch>) -> Orch {
        Self {
            state: Rc::new(OrchState {
                config: self.state.config,
                depth: Cell::new(0),
                dispatch,
            }),
        }
    }

    /// A derived orchestrator sharing this one's dispatcher and limits.
    pub fn child(&self) -> Orch {
        self.with_dispatch(self.dispatcher())
    }

    /// Call an action. Missing continuations become the drain sink; the
    /// call is routed through the [`Dispatch`] seam.
    pub fn call(
        &self,
        action: &Action,
        input: Value,
        success: Option<Action>,
        failure: Option<Action>,
    ) {
        let success = success.unwrap_or_else(Action::drain);
        let failure = failure.unwrap_or_else(Action::drain);
        let dispatch = Rc::clone(&self.state.dispatch);
        dispatch.dispatch(self, action, input, success, failure);
    }

    /// Trampolined invocation. [`Dispatch`] implementations end up here.
    ///
    /// While the synchronous depth is under `max_depth` the action body
    /// runs on the current stack; past the bound the invocation is
    /// re-entered from a fresh stack on the next scheduler turn, where
    /// the counter has already unwound.
    pub fn invoke(&self, action: &Action, input: Value, success: Action, failure: Action) {
        let depth = self.state.depth.get();
        if depth >= self.state.config.max_depth {
            let m = self.clone();
            let action = action.clone();
            sched::next_tick(move || m.invoke(&action, input, success, failure));
            return;
        }
        self.state.depth.set(depth + 1);
        action.execute(self, input, success, failure);
        self.state.depth.set(depth);
    }

    /// User entry point: call `action` with both continuations drained.
    /// Returns immediately; side effects drive completion.
    pub fn run(&self, input: impl Into<Value>, action: &Action) {
        self.call(action, input.into(), None, None);
    }

    /// Call an action after a delay. A zero delay defers to the next
    /// scheduler turn.
    pub fn delay(
        &self,
        wait: impl Into<DurationMs>,
        action: &Action,
        input: Value,
        success: Option<Action>,
        failure: Option<Action>,
    ) {
        let m = self.clone();
        let action = action.clone();
        sched::after(wait.into(), move || m.call(&action, input, success, failure));
    }
}

impl Default for Orch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Orch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orch")
            .field("config", &self.state.config)
            .field("depth", &self.state.depth.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::WeakAction;
    use std::cell::{OnceCell, RefCell};
    use tokio::task::LocalSet;

    #[test]
    fn defaults_match_the_documented_limits() {
        let c = Config::default();
        assert_eq!(c.max_depth, 50);
        assert_eq!(c.buffer_capacity, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn trampoline_survives_deep_recursion() {
        let result: Rc<Cell<i64>> = Rc::new(Cell::new(-1));
        let r = result.clone();
        let local = LocalSet::new();
        local.spawn_local(async move {
            let m = Orch::new();
            let slot: Rc<OnceCell<WeakAction>> = Rc::new(OnceCell::new());
            let countdown = Action::native("countdown", {
                let slot = slot.clone();
                move |m, input, success, failure| {
                    let n = input.as_i64().unwrap();
                    if n == 0 {
                        m.call(&success, input, None, None);
                    } else {
                        let me = slot.get().and_then(WeakAction::upgrade).unwrap();
                        m.call(&me, Value::from(n - 1), Some(success), Some(failure));
                    }
                }
            });
            slot.set(countdown.downgrade()).ok();
            let done = Action::native("done", move |_m, input, _s, _f| {
                r.set(input.as_i64().unwrap());
            });
            m.call(&countdown, Value::from(10_000i64), Some(done), None);
        });
        local.await;
        assert_eq!(result.get(), 0);
    }

    #[test]
    fn depth_is_bounded_and_restored() {
        let m = Orch::new();
        let depths = Rc::new(RefCell::new(Vec::new()));
        let probe = {
            let depths = depths.clone();
            Action::native("depth-probe", move |m, input, success, _f| {
                depths.borrow_mut().push(m.state.depth.get());
                m.call(&success, input, None, None);
            })
        };
        let seq = crate::seq::chain(vec![probe.clone(), probe.clone(), probe]);
        m.run(Value::from(0i64), &seq);
        let depths = depths.borrow();
        assert_eq!(depths.len(), 3);
        assert!(depths.iter().all(|d| *d <= m.config().max_depth));
        assert_eq!(m.state.depth.get(), 0, "depth unwinds after a synchronous chain");
    }

    #[test]
    fn dispatch_seam_sees_every_call() {
        struct Counting {
            inner: Rc<dyn Dispatch>,
            calls: Rc<RefCell<Vec<&'static str>>>,
        }
        impl Dispatch for Counting {
            fn dispatch(&self, orch: &Orch, action: &Action, input: Value, success: Action, failure: Action) {
                self.calls.borrow_mut().push(action.label());
                self.inner.dispatch(orch, action, input, success, failure);
            }
        }

        let calls = Rc::new(RefCell::new(Vec::new()));
        let base = Orch::new();
        let m = base.with_dispatch(Rc::new(Counting {
            inner: base.dispatcher(),
            calls: calls.clone(),
        }));
        let echo = Action::pure("echo", crate::value::Step::Next);
        m.run(Value::from(1i64), &echo);
        assert_eq!(calls.borrow().as_slice(), &["echo", "drain"]);
    }
}
