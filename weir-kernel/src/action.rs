//! The action representation and its user-facing adapters.
//!
//! Internally there is exactly one shape: a callable invoked as
//! `(orchestrator, input, success, failure)` for effect. Continuations
//! are themselves actions, invoked with drain continuations of their
//! own. User code arrives in friendlier shapes — a pure function, a
//! callback-style completion, or the native form — and each constructor
//! here adapts one of them onto the internal shape. Misassembled graphs
//! are unrepresentable: the adapters are typed, so there is no runtime
//! arity inspection to get wrong.

use crate::error::IoError;
use crate::orch::Orch;
use crate::value::{Step, Value};
use std::fmt;
use std::rc::{Rc, Weak};

type NativeFn = dyn Fn(&Orch, Value, Action, Action);

struct ActionInner {
    label: &'static str,
    run: Box<NativeFn>,
}

/// A composable unit of effectful computation.
///
/// An action must eventually invoke exactly one of its continuations —
/// or deliberately stop (a rejected `filter` input, a finished
/// generator). It is shared by handle: cloning is cheap and clones are
/// the same action.
#[derive(Clone)]
pub struct Action {
    inner: Rc<ActionInner>,
}

impl Action {
    /// The native four-argument form.
    pub fn native(
        label: &'static str,
        run: impl Fn(&Orch, Value, Action, Action) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(ActionInner {
                label,
                run: Box::new(run),
            }),
        }
    }

    /// Adapt a pure function.
    ///
    /// The function's [`Step`] decides the disposition: a value threads
    /// to success, a raise routes to failure, a deferred action is
    /// spliced in at the current position (dynamic dispatch on the
    /// input), and [`Step::Stop`] ends the sequence.
    pub fn pure(label: &'static str, f: impl Fn(Value) -> Step + 'static) -> Self {
        Self::native(label, move |m, input, success, failure| {
            match f(input.clone()) {
                Step::Next(v) => m.call(&success, v, None, None),
                Step::Stop => {}
                Step::Defer(a) => m.call(&a, input, Some(success), Some(failure)),
                Step::Raise(payload) => {
                    IoError::deliver(m, payload, input, success, failure);
                }
            }
        })
    }

    /// Adapt a callback-style function taking the input and two
    /// completion handles.
    pub fn cps(label: &'static str, f: impl Fn(Value, Flow, Flow) + 'static) -> Self {
        Self::native(label, move |m, input, success, failure| {
            let ok = Flow::new(m, success);
            let err = Flow::new(m, failure);
            f(input, ok, err);
        })
    }

    /// Adapt a callback-style function that ignores its input.
    pub fn cps0(label: &'static str, f: impl Fn(Flow, Flow) + 'static) -> Self {
        Self::native(label, move |m, _input, success, failure| {
            let ok = Flow::new(m, success);
            let err = Flow::new(m, failure);
            f(ok, err);
        })
    }

    /// The label shown by the tracing orchestrator.
    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    /// Run the action body. Callers go through
    /// [`Orch::call`](crate::Orch::call), which bounds recursion and
    /// normalizes missing continuations; this is the raw entry the
    /// orchestrator uses.
    pub fn execute(&self, orch: &Orch, input: Value, success: Action, failure: Action) {
        (self.inner.run)(orch, input, success, failure);
    }

    /// Identity comparison: clones of one action are the same action.
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A weak handle, for actions that need to refer to themselves
    /// without keeping themselves alive.
    pub fn downgrade(&self) -> WeakAction {
        WeakAction {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The terminal sink. Discards successes; logs uncaught failures.
    pub fn drain() -> Action {
        DRAIN.with(Action::clone)
    }

    /// Whether this is the drain sink.
    pub fn is_drain(&self) -> bool {
        DRAIN.with(|d| Rc::ptr_eq(&d.inner, &self.inner))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<action {}>", self.inner.label)
    }
}

thread_local! {
    static DRAIN: Action = Action::native("drain", |_m, input, _s, _f| match input {
        Value::Error(err) => {
            tracing::warn!(target: "weir", error = %err, "weir.drain.uncaught");
        }
        Value::Pause(_) => {
            tracing::debug!(target: "weir", "weir.drain.pause");
        }
        _ => {}
    });
}

/// A weak [`Action`] handle.
pub struct WeakAction {
    inner: Weak<ActionInner>,
}

impl WeakAction {
    /// The action, if it is still alive.
    pub fn upgrade(&self) -> Option<Action> {
        self.inner.upgrade().map(|inner| Action { inner })
    }
}

/// A completion handle handed to callback-style actions.
///
/// Pairs the orchestrator in force at invocation time with one
/// continuation; [`send`](Flow::send) fires it. A callback action
/// completes by sending on exactly one of its two flows.
#[derive(Clone)]
pub struct Flow {
    orch: Orch,
    cont: Action,
}

impl Flow {
    fn new(orch: &Orch, cont: Action) -> Self {
        Self {
            orch: orch.clone(),
            cont,
        }
    }

    /// Deliver a value to the held continuation.
    pub fn send(&self, value: impl Into<Value>) {
        self.orch.call(&self.cont, value.into(), None, None);
    }
}
