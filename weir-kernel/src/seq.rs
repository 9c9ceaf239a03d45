//! The sequencing core.
//!
//! `chain` is the workhorse: it walks its actions by index, materializing
//! each continuation lazily as execution reaches it, so a thousand-stage
//! pipeline never builds a thousand-deep closure nest up front. The
//! continuation form is the right fold — each stage's successor carries
//! the chain remainder and the outer success — which keeps the outer
//! failure continuation intact under failure.

use crate::action::Action;
use crate::orch::Orch;
use crate::value::Value;
use std::rc::Rc;

/// Deliver the input to the success continuation.
pub fn pass() -> Action {
    Action::native("pass", |m, input, success, _f| {
        m.call(&success, input, None, None);
    })
}

/// Deliver the input to the failure continuation, as-is.
pub fn fail() -> Action {
    Action::native("fail", |m, input, _s, failure| {
        m.call(&failure, input, None, None);
    })
}

/// Invoke `action` with the fixed input `x`, ignoring the inbound input.
pub fn send(x: impl Into<Value>, action: Action) -> Action {
    let x = x.into();
    Action::native("send", move |m, _input, success, failure| {
        m.call(&action, x.clone(), Some(success), Some(failure));
    })
}

/// An action that unconditionally dispatches on the given orchestrator,
/// whatever orchestrator it is invoked in.
pub fn bind(orch: Orch, action: Action) -> Action {
    Action::native("bind", move |_m, input, success, failure| {
        orch.call(&action, input, Some(success), Some(failure));
    })
}

/// Run `first`, thread its output into `second`.
pub fn seq(first: Action, second: Action) -> Action {
    chain(vec![first, second])
}

/// Run the actions in source order, threading each output into the next.
///
/// The empty chain is `pass`; a one-element chain is that action.
pub fn chain(actions: Vec<Action>) -> Action {
    let actions = Rc::new(actions);
    Action::native("chain", move |m, input, success, failure| {
        step(m, Rc::clone(&actions), 0, input, success, failure);
    })
}

fn step(
    m: &Orch,
    actions: Rc<Vec<Action>>,
    index: usize,
    input: Value,
    success: Action,
    failure: Action,
) {
    if index == actions.len() {
        m.call(&success, input, None, None);
        return;
    }
    let next = {
        let actions = Rc::clone(&actions);
        let success = success.clone();
        let failure = failure.clone();
        Action::native("chain.next", move |m2, output, _sk, fk| {
            // A stage that supplies an explicit failure continuation when
            // delivering (a catch guard, a generator's pause catcher)
            // rebinds the remainder of the chain to it.
            let failure = if fk.is_drain() { failure.clone() } else { fk };
            step(m2, Rc::clone(&actions), index + 1, output, success.clone(), failure);
        })
    };
    m.call(&actions[index], input, Some(next), Some(failure));
}

/// Invoke `action` with fixed success and failure continuations,
/// ignoring the outer ones.
pub fn branch(action: Action, success: Action, failure: Action) -> Action {
    Action::native("branch", move |m, input, _s, _f| {
        m.call(&action, input, Some(success.clone()), Some(failure.clone()));
    })
}
