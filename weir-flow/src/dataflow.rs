//! Generic value plumbing.
//!
//! These are the per-item workers of a pipeline: transform, drop,
//! accumulate, annotate, observe. All of them are pure adapters except
//! `reduce`, which owns its accumulator across activations, and `log`,
//! which emits a structured tracing event.

use serde_json::Value as Json;
use std::cell::RefCell;
use std::rc::Rc;
use weir_kernel::{Action, Step, Value};

/// Transform each input with `f`.
pub fn map(f: impl Fn(Value) -> Value + 'static) -> Action {
    Action::pure("map", move |v| Step::Next(f(v)))
}

/// Pass inputs satisfying `p`; rejected inputs simply stop — they are
/// neither successes nor failures.
pub fn filter(p: impl Fn(&Value) -> bool + 'static) -> Action {
    Action::pure("filter", move |v| {
        if p(&v) {
            Step::Next(v)
        } else {
            Step::Stop
        }
    })
}

/// Fold inputs into an accumulator carried across activations; each
/// activation emits the running value.
pub fn reduce(f: impl Fn(Value, Value) -> Value + 'static, init: impl Into<Value>) -> Action {
    let acc = Rc::new(RefCell::new(init.into()));
    Action::pure("reduce", move |v| {
        let next = f(acc.borrow().clone(), v);
        *acc.borrow_mut() = next.clone();
        Step::Next(next)
    })
}

/// Shallow-merge the keys of `fields` on top of the input record. A
/// non-record input is treated as the empty record.
pub fn add(fields: Json) -> Action {
    Action::pure("add", move |v| {
        let mut record = match v.as_json() {
            Some(Json::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        if let Json::Object(extra) = &fields {
            for (k, val) in extra {
                record.insert(k.clone(), val.clone());
            }
        }
        Step::Next(Value::Json(Json::Object(record)))
    })
}

/// Replace the input with `v`.
pub fn supply(v: impl Into<Value>) -> Action {
    let v = v.into();
    Action::pure("supply", move |_| Step::Next(v.clone()))
}

/// Fire-and-forget observer: `f` sees each input, the input passes
/// through unchanged.
pub fn probe(f: impl Fn(&Value) + 'static) -> Action {
    Action::pure("probe", move |v| {
        f(&v);
        Step::Next(v)
    })
}

/// Log each input under `label` and pass it through.
pub fn log(label: &'static str) -> Action {
    Action::native("log", move |m, input, success, _f| {
        tracing::info!(target: "weir", label, input = %input, "weir.log");
        m.call(&success, input, None, None);
    })
}
