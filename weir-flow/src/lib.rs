//! # weir-flow — combinators over the weir kernel
//!
//! Everything here builds [`Action`](weir_kernel::Action)s out of other
//! actions, in six families:
//!
//! | Family | Module | Combinators |
//! |--------|--------|-------------|
//! | Concurrency | `concurrent` | `fork`, `tee`, `any`, `alt`, `sync`, `timeout` |
//! | Interruption | `interrupt` | `interruptible`, `interruption` |
//! | Streams | `stream` | `generate`, `pause`, `spray`, `cycle`, `enum_from`, `collect_until` |
//! | Timers | `timer` | `clock`, `debounce`, `delay` |
//! | Serialization | `atomic` | `atomic`, `pipeline` |
//! | Channels | `chan` | `chan` |
//! | Data flow | `dataflow`, `pattern` | `map`, `filter`, `reduce`, `add`, `supply`, `probe`, `log`, `cond` |
//!
//! The stateful combinators (`atomic`, `chan`, `sync`, `reduce`,
//! `debounce`, `clock`, `interruption`) each own a small record shared
//! by their instance's closures; the single-threaded cooperative model
//! makes plain `Rc<RefCell<…>>`/`Cell` cells sufficient — no locking,
//! by construction.

#![deny(missing_docs)]

pub mod atomic;
pub mod chan;
pub mod concurrent;
pub mod dataflow;
pub mod interrupt;
pub mod pattern;
pub mod stream;
pub mod timer;

// Re-exports for convenience
pub use atomic::{atomic, pipeline};
pub use chan::{chan, Channel};
pub use concurrent::{alt, any, fork, sync, tee, timeout, Rendezvous};
pub use dataflow::{add, filter, log, map, probe, reduce, supply};
pub use interrupt::{interruptible, interruption, InterruptGuard, Interruptible, Interruption};
pub use pattern::{cond, Pattern};
pub use stream::{
    collect_until, collect_until_end, cycle, cycle_input, enum_from, generate, pause, spray,
    spray_input,
};
pub use timer::{clock, debounce, delay};
