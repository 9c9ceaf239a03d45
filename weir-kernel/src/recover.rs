//! Raising and recovering.
//!
//! `raise` packages the failure point into an [`IoError`] and sends it
//! down the failure channel. `catch` installs a handler over everything
//! downstream of it; the handler sees the error as its input and decides:
//! succeed (resume forward from the raise site), fail (roll back to the
//! outer handler), or re-enter the whole protected region via the
//! error's `restart`. Pause signals are not errors and never reach a
//! handler — they pass through to the outer failure untouched.

use crate::action::Action;
use crate::error::IoError;
use crate::orch::Orch;
use crate::value::Value;

/// Deliver a fresh [`IoError`] carrying `payload` to the failure
/// continuation, capturing the input and both continuations in force.
pub fn raise(payload: impl Into<Value>) -> Action {
    let payload = payload.into();
    Action::native("raise", move |m, input, success, failure| {
        IoError::deliver(m, payload.clone(), input, success, failure);
    })
}

/// Protect everything downstream with `handler`.
///
/// On a failure in the protected region the handler runs with the
/// [`IoError`] as its input. The handler's success continuation is the
/// raise site's successor (succeeding means "swallowed, resume
/// forward"); its failure continuation is the outer failure (failing
/// means rollback). The error additionally carries `restart`, which
/// re-enters the protected region from the top.
///
/// If the region never fails, `catch` is a no-op.
pub fn catch(handler: Action) -> Action {
    Action::native("catch", move |m, input, success, failure| {
        enter(m, handler.clone(), input, success, failure);
    })
}

fn enter(m: &Orch, handler: Action, input: Value, success: Action, failure: Action) {
    let guard = {
        let handler = handler.clone();
        let success = success.clone();
        let failure = failure.clone();
        Action::native("catch.guard", move |m2, fault, _sk, _fk| {
            let outer = failure.clone();
            match fault {
                // Backpressure is not an error; unaware handlers must
                // not swallow it.
                fault @ Value::Pause(_) => m2.call(&outer, fault, None, None),
                fault => {
                    let err = match fault {
                        Value::Error(err) => err,
                        raw => IoError::new(m2, raw.clone(), raw, Action::drain(), outer.clone()),
                    };
                    err.rebind_failure(outer.clone());
                    err.bind_restart({
                        let m2 = m2.clone();
                        let handler = handler.clone();
                        let success = success.clone();
                        let failure = failure.clone();
                        move |v| enter(&m2, handler.clone(), v, success.clone(), failure.clone())
                    });
                    let resume_at = err.success();
                    m2.call(&handler, Value::Error(err), Some(resume_at), Some(outer));
                }
            }
        })
    };
    m.call(&success, input, None, Some(guard));
}

/// Run `action`; run `cleanup` with the original input on either
/// disposition; then let the original disposition proceed. Cleanup's own
/// outcome is discarded (a failing cleanup is visible only at drain).
///
/// On the failure path the error's resume target is rebound to the
/// finally boundary, so an outer handler's `resume` continues *after*
/// the cleanup instead of re-entering the raw raise site.
pub fn finally(cleanup: Action, action: Action) -> Action {
    Action::native("finally", move |m, input, success, failure| {
        let on_ok = {
            let cleanup = cleanup.clone();
            let success = success.clone();
            let original = input.clone();
            Action::native("finally.ok", move |m2, output, _sk, _fk| {
                let deliver = {
                    let success = success.clone();
                    Action::native("finally.deliver", move |m3, _cleanup_out, _s, _f| {
                        m3.call(&success, output.clone(), None, None);
                    })
                };
                m2.call(&cleanup, original.clone(), Some(deliver.clone()), Some(deliver));
            })
        };
        let on_err = {
            let cleanup = cleanup.clone();
            let success = success.clone();
            let failure = failure.clone();
            let original = input.clone();
            Action::native("finally.err", move |m2, fault, _sk, _fk| {
                if matches!(fault, Value::Pause(_)) {
                    // Suspension, not completion: the region will resume
                    // and finish later, and cleanup runs then.
                    m2.call(&failure, fault, None, None);
                    return;
                }
                if let Value::Error(err) = &fault {
                    err.rebind_success(success.clone());
                }
                let deliver = {
                    let failure = failure.clone();
                    Action::native("finally.deliver", move |m3, _cleanup_out, _s, _f| {
                        m3.call(&failure, fault.clone(), None, None);
                    })
                };
                m2.call(&cleanup, original.clone(), Some(deliver.clone()), Some(deliver));
            })
        };
        m.call(&action, input.clone(), Some(on_ok), Some(on_err));
    })
}

/// One-shot catch around a single action: on failure, `onfail` runs with
/// the error and joins back to the surrounding success.
pub fn attempt(action: Action, onfail: Action) -> Action {
    Action::native("attempt", move |m, input, success, failure| {
        let rescue = {
            let onfail = onfail.clone();
            let success = success.clone();
            let failure = failure.clone();
            Action::native("attempt.rescue", move |m2, fault, _sk, _fk| {
                match fault {
                    fault @ Value::Pause(_) => m2.call(&failure, fault, None, None),
                    fault => m2.call(&onfail, fault, Some(success.clone()), Some(failure.clone())),
                }
            })
        };
        m.call(&action, input, Some(success.clone()), Some(rescue));
    })
}

/// A catch handler that discards the error and continues forward with
/// the input that was present at the failure point.
pub fn forgive() -> Action {
    Action::native("forgive", |m, input, success, _f| {
        let v = match &input {
            Value::Error(err) => err.input(),
            other => other.clone(),
        };
        m.call(&success, v, None, None);
    })
}

/// A catch handler built from a closure over the [`IoError`].
///
/// The closure decides by calling `resume`, `rollback` or `restart` on
/// the error; the handler itself stops afterwards. A closure that calls
/// none of them abandons the sequence.
pub fn on_error(f: impl Fn(IoError) + 'static) -> Action {
    Action::native("on-error", move |_m, input, _s, _f| {
        if let Value::Error(err) = input {
            f(err);
        }
    })
}
