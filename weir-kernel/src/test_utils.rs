//! Test helpers, behind the `test-utils` feature.
//!
//! Minimal pieces that make action graphs observable from tests without
//! reaching into combinator internals.

use crate::action::Action;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// A shared log of every value that flowed through its probe action.
///
/// ```
/// use weir_kernel::{chain, pass, Orch, Value};
/// use weir_kernel::test_utils::Recorder;
///
/// let m = Orch::new();
/// let rec = Recorder::new();
/// m.run(Value::from(1i64), &chain(vec![pass(), rec.record()]));
/// assert_eq!(rec.values(), vec![Value::from(1i64)]);
/// ```
#[derive(Clone, Default)]
pub struct Recorder {
    values: Rc<RefCell<Vec<Value>>>,
}

impl Recorder {
    /// A fresh, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// An action that records its input and passes it through.
    pub fn record(&self) -> Action {
        let values = self.values.clone();
        Action::native("record", move |m, input, success, _f| {
            values.borrow_mut().push(input.clone());
            m.call(&success, input, None, None);
        })
    }

    /// An action that records its input and stops the sequence.
    pub fn sink(&self) -> Action {
        let values = self.values.clone();
        Action::native("record.sink", move |_m, input, _s, _f| {
            values.borrow_mut().push(input);
        })
    }

    /// Everything recorded so far.
    pub fn values(&self) -> Vec<Value> {
        self.values.borrow().clone()
    }

    /// The most recent recorded value.
    pub fn last(&self) -> Option<Value> {
        self.values.borrow().last().cloned()
    }

    /// How many values have been recorded.
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}
