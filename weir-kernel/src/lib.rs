//! # weir-kernel — the continuation-passing action kernel
//!
//! Actions are effectful computations with a four-continuation calling
//! convention: `(orchestrator, input, success, failure)`. This crate
//! defines that representation and the machinery that calls it.
//!
//! | Piece | Module | What it does |
//! |-------|--------|-------------|
//! | [`Value`] / [`Step`] | `value` | The datum flowing through actions |
//! | [`Action`] / [`Flow`] | `action` | Representation + user-shape adapters |
//! | [`Orch`] / [`Dispatch`] | `orch` | Trampolined dispatch, the substitution seam |
//! | `next_tick` / `after` / `run_local` | `sched` | Scheduler primitives and the entry driver |
//! | `pass`, `chain`, … | `seq` | The sequencing core |
//! | [`IoError`] / [`PauseSignal`] / `catch`, … | `error`, `recover` | The recoverable error model |
//!
//! ## Design principle
//!
//! Failures are values on the failure channel, never host unwinding. An
//! [`IoError`] carries its raise site's continuations, so the nearest
//! handler can resume forward, restart the region, or roll back — the
//! error decides nothing, the handler decides everything.
//!
//! ## Dependency notes
//!
//! Plain data payloads are `serde_json::Value`: JSON is the universal
//! interchange format and keeps record merging and shape matching
//! trivial. Scheduling rides tokio's current-thread runtime —
//! continuations are `Rc`-shared and `!Send`, so everything runs on a
//! `LocalSet` and "concurrency" means interleaving across scheduler
//! turns, never threads.

#![deny(missing_docs)]

pub mod action;
pub mod duration;
pub mod error;
pub mod orch;
pub mod recover;
pub mod sched;
pub mod seq;
pub mod value;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use action::{Action, Flow, WeakAction};
pub use duration::DurationMs;
pub use error::{Condition, IoError, PauseSignal};
pub use orch::{Config, DefaultDispatch, Dispatch, Orch};
pub use recover::{attempt, catch, finally, forgive, on_error, raise};
pub use sched::{after, next_tick, run_local};
pub use seq::{bind, branch, chain, fail, pass, send, seq};
pub use value::{Step, Value};
