//! Pattern dispatch.
//!
//! `cond` tries its branches in order and runs the first whose pattern
//! matches the input. Patterns are built recursively: a predicate, a
//! record shape (declared keys must be present and match, extra keys on
//! the candidate are ignored), or strict equality for everything else.

use serde_json::Value as Json;
use std::rc::Rc;
use weir_kernel::{Action, Condition, IoError, Value};

/// A pattern over [`Value`]s.
#[derive(Clone)]
pub enum Pattern {
    /// An arbitrary predicate.
    Test(Rc<dyn Fn(&Value) -> bool>),
    /// A record shape: each declared key must be present on the
    /// candidate record and its sub-pattern must match.
    Shape(Vec<(String, Pattern)>),
    /// Strict equality.
    Exact(Value),
}

impl Pattern {
    /// A predicate pattern.
    pub fn test(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Pattern::Test(Rc::new(f))
    }

    /// A record-shape pattern.
    pub fn shape(fields: impl IntoIterator<Item = (&'static str, Pattern)>) -> Self {
        Pattern::Shape(
            fields
                .into_iter()
                .map(|(k, p)| (k.to_string(), p))
                .collect(),
        )
    }

    /// A strict-equality pattern.
    pub fn exact(v: impl Into<Value>) -> Self {
        Pattern::Exact(v.into())
    }

    /// Whether the candidate matches.
    pub fn matches(&self, candidate: &Value) -> bool {
        match self {
            Pattern::Test(f) => f(candidate),
            Pattern::Shape(fields) => {
                let Some(Json::Object(map)) = candidate.as_json() else {
                    return false;
                };
                fields.iter().all(|(key, sub)| {
                    map.get(key)
                        .is_some_and(|v| sub.matches(&Value::Json(v.clone())))
                })
            }
            Pattern::Exact(expected) => expected == candidate,
        }
    }
}

impl From<Json> for Pattern {
    fn from(j: Json) -> Self {
        Pattern::Exact(Value::Json(j))
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Test(_) => f.write_str("Test"),
            Pattern::Shape(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, p)| (k, p)))
                .finish(),
            Pattern::Exact(v) => write!(f, "Exact({v})"),
        }
    }
}

/// Sequential pattern dispatch: the first matching branch runs with the
/// input; on no match the default runs, or [`Condition::Unmatched`] is
/// raised.
pub fn cond(branches: Vec<(Pattern, Action)>, default: Option<Action>) -> Action {
    Action::native("cond", move |m, input, success, failure| {
        for (pattern, action) in &branches {
            if pattern.matches(&input) {
                m.call(action, input.clone(), Some(success.clone()), Some(failure.clone()));
                return;
            }
        }
        match &default {
            Some(action) => m.call(action, input, Some(success), Some(failure)),
            None => IoError::deliver(m, Condition::Unmatched.into(), input, success, failure),
        }
    })
}
