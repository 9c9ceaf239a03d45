//! The recoverable error model.
//!
//! Failures never unwind across an action boundary. They travel the
//! failure channel as values: an [`IoError`] carries the continuations of
//! its raise site, so the nearest handler can *resume* forward, *restart*
//! the protected region, or *roll back* to an outer handler. A
//! [`PauseSignal`] travels the same channel but is not an error at all —
//! it is the backpressure handshake between a bounded consumer and the
//! generator feeding it.

use crate::action::Action;
use crate::orch::Orch;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Kernel-originated failure payloads.
///
/// User code raises arbitrary [`Value`] payloads; the kernel's own
/// combinators raise these. The display string is the payload delivered
/// on the failure channel, so handlers can match on it.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Condition {
    /// An interruption handle fired.
    #[error("interrupted")]
    Interrupted,

    /// `alt` ran out of alternatives.
    #[error("no alternative succeeded")]
    AltExhausted,

    /// Every branch of an `any` failed (or there were none).
    #[error("every branch failed")]
    AllFailed,

    /// `cond` found no matching pattern and had no default.
    #[error("no pattern matched")]
    Unmatched,
}

struct ErrorState {
    orch: Orch,
    payload: Value,
    input: RefCell<Value>,
    success: RefCell<Action>,
    failure: RefCell<Action>,
    restart: RefCell<Option<Rc<dyn Fn(Value)>>>,
}

/// A recoverable failure travelling the failure channel.
///
/// Captures the raise site: the error payload, the input present at the
/// point of failure, and the success/failure continuations that were in
/// force there. The derived operations re-enter the graph:
///
/// | Operation | Re-enters |
/// |-----------|-----------|
/// | [`resume`](IoError::resume) | the raise site's successor |
/// | [`restart`](IoError::restart) | the protected region, from the top |
/// | [`rollback`](IoError::rollback) | the outer failure handler |
///
/// `restart` is attached by `catch` when the error passes its guard;
/// before that, restarting falls back to rolling back. The continuations
/// live exactly as long as the error value itself.
#[derive(Clone)]
pub struct IoError {
    state: Rc<ErrorState>,
}

impl IoError {
    /// Capture a raise site.
    pub fn new(
        orch: &Orch,
        payload: Value,
        input: Value,
        success: Action,
        failure: Action,
    ) -> Self {
        Self {
            state: Rc::new(ErrorState {
                orch: orch.clone(),
                payload,
                input: RefCell::new(input),
                success: RefCell::new(success),
                failure: RefCell::new(failure),
                restart: RefCell::new(None),
            }),
        }
    }

    /// Build an error at this point and hand it straight to `failure`.
    pub fn deliver(
        orch: &Orch,
        payload: Value,
        input: Value,
        success: Action,
        failure: Action,
    ) {
        let err = IoError::new(orch, payload, input, success, failure.clone());
        orch.call(&failure, Value::Error(err), None, None);
    }

    /// The error payload.
    pub fn payload(&self) -> Value {
        self.state.payload.clone()
    }

    /// The input present at the failure point.
    pub fn input(&self) -> Value {
        self.state.input.borrow().clone()
    }

    /// The captured success continuation (the raise site's successor).
    pub fn success(&self) -> Action {
        self.state.success.borrow().clone()
    }

    /// The captured failure continuation (the outer handler).
    pub fn failure(&self) -> Action {
        self.state.failure.borrow().clone()
    }

    /// Re-enter the raise site's successor with `v`.
    pub fn resume(&self, v: impl Into<Value>) {
        let k = self.success();
        self.state.orch.call(&k, v.into(), None, None);
    }

    /// Bypass the current handler: re-deliver this error to the outer
    /// failure, with the input rebound to `v`.
    pub fn rollback(&self, v: impl Into<Value>) {
        *self.state.input.borrow_mut() = v.into();
        let f = self.failure();
        self.state.orch.call(&f, Value::Error(self.clone()), None, None);
    }

    /// Re-enter the protected region from the top with input `v`.
    ///
    /// Only meaningful after a `catch` guard has seen this error; before
    /// that it behaves like [`rollback`](IoError::rollback).
    pub fn restart(&self, v: impl Into<Value>) {
        let re = self.state.restart.borrow().clone();
        match re {
            Some(re) => re(v.into()),
            None => self.rollback(v),
        }
    }

    /// Whether a protected region is attached.
    pub fn can_restart(&self) -> bool {
        self.state.restart.borrow().is_some()
    }

    /// Attach the restart entry point. Called by `catch`.
    pub fn bind_restart(&self, re: impl Fn(Value) + 'static) {
        *self.state.restart.borrow_mut() = Some(Rc::new(re));
    }

    /// Rebind the resume target. `finally` uses this so an outer resume
    /// re-enters at the finally boundary, after cleanup has run.
    pub fn rebind_success(&self, k: Action) {
        *self.state.success.borrow_mut() = k;
    }

    /// Rebind the outer failure. `catch` uses this before invoking its
    /// handler, so a rollback skips the handler that is already running.
    pub fn rebind_failure(&self, f: Action) {
        *self.state.failure.borrow_mut() = f;
    }

    /// Identity comparison.
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (input {})", self.state.payload, self.state.input.borrow())
    }
}

impl fmt::Debug for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoError")
            .field("payload", &self.state.payload)
            .field("input", &self.state.input.borrow())
            .field("can_restart", &self.can_restart())
            .finish_non_exhaustive()
    }
}

struct PauseState {
    waiters: RefCell<Vec<Box<dyn FnOnce()>>>,
    resumed: Cell<bool>,
}

/// A backpressure signal on the failure channel.
///
/// Raised by a bounded consumer (an `atomic` with a full waiter queue, or
/// the `pause` action) in lieu of accepting an input. An upstream
/// generator that recognizes it parks and registers a resume callback;
/// handlers that do not recognize it must propagate it outward untouched.
///
/// `resume` fires every registered callback once and clears the list.
/// Registering on an already-resumed signal fires immediately — the
/// window between drain and registration is otherwise a lost wakeup.
#[derive(Clone)]
pub struct PauseSignal {
    state: Rc<PauseState>,
}

impl PauseSignal {
    /// A fresh, un-resumed signal.
    pub fn new() -> Self {
        Self {
            state: Rc::new(PauseState {
                waiters: RefCell::new(Vec::new()),
                resumed: Cell::new(false),
            }),
        }
    }

    /// Register a callback to run when the signal resumes.
    pub fn on_resume(&self, f: impl FnOnce() + 'static) {
        if self.state.resumed.get() {
            f();
        } else {
            self.state.waiters.borrow_mut().push(Box::new(f));
        }
    }

    /// Fire and clear all registered callbacks.
    pub fn resume(&self) {
        self.state.resumed.set(true);
        let waiters = std::mem::take(&mut *self.state.waiters.borrow_mut());
        for w in waiters {
            w();
        }
    }

    /// Whether the signal has already resumed.
    pub fn is_resumed(&self) -> bool {
        self.state.resumed.get()
    }

    /// Identity comparison.
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for PauseSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PauseSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseSignal")
            .field("resumed", &self.is_resumed())
            .field("waiters", &self.state.waiters.borrow().len())
            .finish()
    }
}
