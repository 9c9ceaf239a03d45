//! The datum type that flows through actions.
//!
//! Everything an action can receive or emit is a [`Value`]: JSON data,
//! lists of collected results, other actions (a timeout hands its whole
//! self to the retry handler), in-flight recoverable errors, and
//! backpressure signals. JSON is the payload format for plain data —
//! `serde_json::Value` is the de facto interchange type in the Rust
//! ecosystem and keeps `cond` shape-matching and `add` record-merging
//! trivial.

use crate::action::Action;
use crate::error::{Condition, IoError, PauseSignal};
use serde_json::Value as Json;
use std::fmt;

/// A value flowing through an action graph.
#[non_exhaustive]
#[derive(Clone)]
pub enum Value {
    /// The distinguished absent value: generator end, stop marker.
    Nothing,
    /// Plain data.
    Json(Json),
    /// An ordered collection of values (fork results, collected prefixes).
    List(Vec<Value>),
    /// An action as data.
    Act(Action),
    /// A recoverable failure in flight on the failure channel.
    Error(IoError),
    /// A backpressure signal in flight on the failure channel.
    Pause(PauseSignal),
}

impl Value {
    /// Whether this is the absent value.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    /// The JSON payload, if this is plain data.
    pub fn as_json(&self) -> Option<&Json> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }

    /// Integer view of a JSON number.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_json().and_then(Json::as_i64)
    }

    /// Float view of a JSON number.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_json().and_then(Json::as_f64)
    }

    /// String view of a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Json::as_str)
    }

    /// The element list, if this is a collection.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The carried action, if any.
    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Value::Act(a) => Some(a),
            _ => None,
        }
    }

    /// The carried error, if any.
    pub fn as_error(&self) -> Option<&IoError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// The carried pause signal, if any.
    pub fn as_pause(&self) -> Option<&PauseSignal> {
        match self {
            Value::Pause(p) => Some(p),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for data, identity for handles.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Act(a), Value::Act(b)) => a.same(b),
            (Value::Error(a), Value::Error(b)) => a.same(b),
            (Value::Pause(a), Value::Pause(b)) => a.same(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => f.write_str("Nothing"),
            Value::Json(j) => write!(f, "Json({j})"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Act(a) => write!(f, "Act({})", a.label()),
            Value::Error(e) => write!(f, "Error({e})"),
            Value::Pause(_) => f.write_str("Pause"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => f.write_str("nothing"),
            Value::Json(j) => write!(f, "{j}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Act(a) => write!(f, "<action {}>", a.label()),
            Value::Error(e) => write!(f, "<error {e}>"),
            Value::Pause(_) => f.write_str("<pause>"),
        }
    }
}

impl From<Json> for Value {
    fn from(j: Json) -> Self {
        Value::Json(j)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Json(Json::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Json(Json::String(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Json(Json::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Json(Json::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Json(Json::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Json(Json::Bool(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Action> for Value {
    fn from(a: Action) -> Self {
        Value::Act(a)
    }
}

impl From<IoError> for Value {
    fn from(e: IoError) -> Self {
        Value::Error(e)
    }
}

impl From<PauseSignal> for Value {
    fn from(p: PauseSignal) -> Self {
        Value::Pause(p)
    }
}

impl From<Condition> for Value {
    fn from(c: Condition) -> Self {
        Value::Json(Json::String(c.to_string()))
    }
}

/// What a pure action yields per activation.
///
/// This is the explicit sum of the outcomes a one-argument user function
/// can have: produce a value, end the sequence, dynamically splice in
/// another action, or fail. See [`Action::pure`](crate::Action::pure).
#[non_exhaustive]
pub enum Step {
    /// Thread a value to the success continuation.
    Next(Value),
    /// End the sequence — no continuation is invoked.
    Stop,
    /// Splice the given action in at the current position, with the
    /// current input and continuations.
    Defer(Action),
    /// Route a payload to the failure continuation as an [`IoError`].
    Raise(Value),
}
