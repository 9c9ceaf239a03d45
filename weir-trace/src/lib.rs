#![deny(missing_docs)]
//! Tracing decorator for the weir orchestrator.
//!
//! [`trace`] wraps a parent orchestrator's dispatcher so that every call
//! emits one structured [`tracing`] event — the action's label, its
//! input, and the label of the failure continuation in force — and then
//! delegates. Semantics are identical to the parent; the decorated
//! orchestrator is fully substitutable for it.
//!
//! Wire to any `tracing`-compatible subscriber (`tracing-subscriber`
//! for stdout, OpenTelemetry exporters for traces).

use std::rc::Rc;
use weir_kernel::{Action, Dispatch, Orch, Value};

/// A [`Dispatch`] that logs each call, then delegates to the wrapped
/// dispatcher. Observes but never controls.
pub struct TraceDispatch {
    inner: Rc<dyn Dispatch>,
}

impl TraceDispatch {
    /// Wrap a dispatcher.
    pub fn new(inner: Rc<dyn Dispatch>) -> Self {
        Self { inner }
    }
}

impl Dispatch for TraceDispatch {
    fn dispatch(&self, orch: &Orch, action: &Action, input: Value, success: Action, failure: Action) {
        tracing::debug!(
            target: "weir",
            action = action.label(),
            input = %input,
            on_fail = failure.label(),
            "weir.call"
        );
        self.inner.dispatch(orch, action, input, success, failure);
    }
}

/// A decorated orchestrator that logs every call the parent would make.
pub fn trace(parent: &Orch) -> Orch {
    parent.with_dispatch(Rc::new(TraceDispatch::new(parent.dispatcher())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use weir_kernel::test_utils::Recorder;
    use weir_kernel::{chain, pass, raise, Orch};

    #[test]
    fn traced_semantics_match_the_parent() {
        let parent = Orch::new();
        let traced = trace(&parent);
        let rec = Recorder::new();
        let errs = Recorder::new();
        let a = chain(vec![pass(), raise("boom")]);
        traced.call(&a, Value::from(1i64), Some(rec.sink()), Some(errs.sink()));
        assert!(rec.is_empty());
        assert_eq!(errs.len(), 1, "failures route exactly as in the parent");
    }

    #[test]
    fn every_call_is_observed() {
        struct Tap {
            inner: Rc<dyn Dispatch>,
            labels: Rc<RefCell<Vec<&'static str>>>,
        }
        impl Dispatch for Tap {
            fn dispatch(&self, orch: &Orch, action: &Action, input: Value, success: Action, failure: Action) {
                self.labels.borrow_mut().push(action.label());
                self.inner.dispatch(orch, action, input, success, failure);
            }
        }

        let labels = Rc::new(RefCell::new(Vec::new()));
        let parent = Orch::new();
        // The tracer composes like any other dispatcher; tap underneath
        // it to observe what it forwards.
        let tapped = parent.with_dispatch(Rc::new(Tap {
            inner: parent.dispatcher(),
            labels: labels.clone(),
        }));
        let traced = trace(&tapped);
        traced.run(Value::Nothing, &pass());
        assert_eq!(labels.borrow().as_slice(), &["pass", "drain"]);
    }
}
