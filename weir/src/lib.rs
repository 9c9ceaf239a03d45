#![deny(missing_docs)]
//! # weir — umbrella crate
//!
//! A single import surface for the weir action combinator library:
//! the kernel (values, orchestrator, scheduler, recoverable errors),
//! the combinator families, and the tracing orchestrator, plus a
//! `prelude` for the happy path.
//!
//! ```
//! use weir::prelude::*;
//!
//! let rec = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
//! let seen = rec.clone();
//! run_local(move || {
//!     let m = Orch::new();
//!     let a = chain(vec![
//!         enum_from(1, 1, 6),
//!         reduce(|acc, v| Value::from(acc.as_i64().unwrap() + v.as_i64().unwrap()), 0i64),
//!         probe(move |v| seen.borrow_mut().push(v.as_i64().unwrap())),
//!     ]);
//!     m.run(Value::from(0i64), &a);
//! })
//! .unwrap();
//! assert_eq!(rec.borrow().last(), Some(&15));
//! ```

pub use weir_flow;
pub use weir_kernel;
pub use weir_trace;

/// Happy-path imports for composing action graphs.
pub mod prelude {
    pub use weir_kernel::{
        attempt, bind, branch, catch, chain, fail, finally, forgive, on_error, pass, raise,
        run_local, send, seq, Action, Condition, Config, DurationMs, Flow, IoError, Orch,
        PauseSignal, Step, Value,
    };

    pub use weir_flow::{
        add, alt, any, atomic, chan, clock, collect_until, collect_until_end, cond, cycle,
        debounce, delay, enum_from, filter, fork, generate, interruptible, interruption, log, map,
        pause, pipeline, probe, reduce, spray, spray_input, supply, sync, tee, timeout, Channel,
        Pattern,
    };

    pub use weir_trace::trace;
}
