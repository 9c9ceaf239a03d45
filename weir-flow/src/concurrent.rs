//! Concurrency combinators.
//!
//! Concurrency here is interleaving: branches are launched on fresh
//! scheduler turns and race through the same single-threaded engine.
//! `fork` joins everything, `any` races to the first success, `alt`
//! falls back sequentially, `tee` splits off an isolated side track,
//! `timeout` arms a watchdog, and `sync` is a counted rendezvous.

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use weir_kernel::{Action, Condition, DurationMs, IoError, Orch, Value, WeakAction};

/// Launch every branch on a fresh tick with the same input; join when
/// all have reported.
///
/// The output is a list in original branch order holding each branch's
/// success value or its [`IoError`](weir_kernel::IoError) — mixed
/// outcomes are a success. Only when every branch failed is a failure
/// delivered: the first branch error, as a representative.
pub fn fork(branches: Vec<Action>) -> Action {
    let branches = Rc::new(branches);
    Action::native("fork", move |m, input, success, failure| {
        let n = branches.len();
        if n == 0 {
            m.call(&success, Value::List(Vec::new()), None, None);
            return;
        }
        let slots: Rc<RefCell<Vec<Option<Value>>>> = Rc::new(RefCell::new(vec![None; n]));
        let failed = Rc::new(Cell::new(0usize));
        let pending = Rc::new(Cell::new(n));
        for (i, branch) in branches.iter().enumerate() {
            let ok = join_slot(i, false, &slots, &failed, &pending, &success, &failure);
            let err = join_slot(i, true, &slots, &failed, &pending, &success, &failure);
            m.delay(DurationMs::ZERO, branch, input.clone(), Some(ok), Some(err));
        }
    })
}

fn join_slot(
    index: usize,
    is_failure: bool,
    slots: &Rc<RefCell<Vec<Option<Value>>>>,
    failed: &Rc<Cell<usize>>,
    pending: &Rc<Cell<usize>>,
    success: &Action,
    failure: &Action,
) -> Action {
    let slots = slots.clone();
    let failed = failed.clone();
    let pending = pending.clone();
    let success = success.clone();
    let failure = failure.clone();
    Action::native("fork.join", move |m, outcome, _s, _f| {
        {
            let mut slots = slots.borrow_mut();
            if slots[index].is_some() {
                return;
            }
            slots[index] = Some(outcome);
        }
        if is_failure {
            failed.set(failed.get() + 1);
        }
        pending.set(pending.get() - 1);
        if pending.get() > 0 {
            return;
        }
        let results: Vec<Value> = slots
            .borrow_mut()
            .iter_mut()
            .map(|slot| slot.take().unwrap_or(Value::Nothing))
            .collect();
        if failed.get() == results.len() {
            let representative = results
                .iter()
                .find(|v| matches!(v, Value::Error(_)))
                .cloned()
                .unwrap_or(Value::Nothing);
            m.call(&failure, representative, None, None);
        } else {
            m.call(&success, Value::List(results), None, None);
        }
    })
}

/// Dispatch `action` on the next tick with drained continuations and
/// forward the input to success synchronously. Errors in the side track
/// are isolated from the main sequence.
pub fn tee(action: Action) -> Action {
    Action::native("tee", move |m, input, success, _f| {
        m.delay(DurationMs::ZERO, &action, input.clone(), None, None);
        m.call(&success, input, None, None);
    })
}

/// Launch every branch with the same input; the first success wins and
/// the rest are dropped. If every branch fails — or there are none —
/// [`Condition::AllFailed`] is raised.
pub fn any(branches: Vec<Action>) -> Action {
    let branches = Rc::new(branches);
    Action::native("any", move |m, input, success, failure| {
        let n = branches.len();
        if n == 0 {
            IoError::deliver(m, Condition::AllFailed.into(), input, success, failure);
            return;
        }
        let done = Rc::new(Cell::new(false));
        let remaining = Rc::new(Cell::new(n));
        for branch in branches.iter() {
            let win = {
                let done = done.clone();
                let success = success.clone();
                Action::native("any.win", move |m2, out, _s, _f| {
                    if !done.replace(true) {
                        m2.call(&success, out, None, None);
                    }
                })
            };
            let lose = {
                let done = done.clone();
                let remaining = remaining.clone();
                let success = success.clone();
                let failure = failure.clone();
                let input = input.clone();
                Action::native("any.lose", move |m2, _fault, _s, _f| {
                    if done.get() {
                        return;
                    }
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        done.set(true);
                        IoError::deliver(
                            m2,
                            Condition::AllFailed.into(),
                            input.clone(),
                            success.clone(),
                            failure.clone(),
                        );
                    }
                })
            };
            m.delay(DurationMs::ZERO, branch, input.clone(), Some(win), Some(lose));
        }
    })
}

/// Try each branch in order with the same input; proceed with the first
/// success. When the alternatives run out, [`Condition::AltExhausted`]
/// is raised. Pauses are backpressure, not failures — they propagate
/// out instead of triggering the next alternative.
pub fn alt(branches: Vec<Action>) -> Action {
    let branches = Rc::new(branches);
    Action::native("alt", move |m, input, success, failure| {
        try_from(m, Rc::clone(&branches), 0, input, success, failure);
    })
}

fn try_from(
    m: &Orch,
    branches: Rc<Vec<Action>>,
    index: usize,
    input: Value,
    success: Action,
    failure: Action,
) {
    if index == branches.len() {
        IoError::deliver(m, Condition::AltExhausted.into(), input, success, failure);
        return;
    }
    let retry = {
        let branches = Rc::clone(&branches);
        let input = input.clone();
        let success = success.clone();
        let failure = failure.clone();
        Action::native("alt.retry", move |m2, fault, _s, _f| {
            if matches!(fault, Value::Pause(_)) {
                m2.call(&failure, fault, None, None);
                return;
            }
            try_from(m2, Rc::clone(&branches), index + 1, input.clone(), success.clone(), failure.clone());
        })
    };
    m.call(&branches[index], input, Some(success), Some(retry));
}

/// A single-shot counted rendezvous.
///
/// `now` parks its continuation; each `later` activation decrements the
/// counter (and passes its own input through); when the counter reaches
/// zero, the parked continuation fires with the input `now` received.
pub struct Rendezvous {
    /// Parks until the count is exhausted.
    pub now: Action,
    /// Decrements the count and passes through.
    pub later: Action,
}

struct SyncState {
    remaining: Cell<usize>,
    parked: RefCell<Option<(Orch, Value, Action)>>,
    fired: Cell<bool>,
}

/// Build a rendezvous expecting `count` later-arrivals.
pub fn sync(count: usize) -> Rendezvous {
    let state = Rc::new(SyncState {
        remaining: Cell::new(count),
        parked: RefCell::new(None),
        fired: Cell::new(false),
    });
    let now = {
        let state = state.clone();
        Action::native("sync.now", move |m, input, success, _f| {
            if state.fired.get() {
                return;
            }
            if state.remaining.get() == 0 {
                state.fired.set(true);
                m.call(&success, input, None, None);
            } else {
                *state.parked.borrow_mut() = Some((m.clone(), input, success));
            }
        })
    };
    let later = {
        let state = state.clone();
        Action::native("sync.later", move |m, input, success, _f| {
            if !state.fired.get() && state.remaining.get() > 0 {
                state.remaining.set(state.remaining.get() - 1);
                if state.remaining.get() == 0 {
                    if let Some((orch, parked_input, parked)) = state.parked.borrow_mut().take() {
                        state.fired.set(true);
                        orch.call(&parked, parked_input, None, None);
                    }
                }
            }
            m.call(&success, input, None, None);
        })
    };
    Rendezvous { now, later }
}

/// Race `action` against a watchdog.
///
/// If the watchdog fires first it suppresses the action's eventual
/// completion and runs `on_timeout` with the whole timeout action as its
/// input (`Value::Act`), so the handler can restart the operation by
/// re-invoking it. If the action completes first the watchdog is
/// suppressed. The underlying action is never preempted — cancellation
/// is continuation-level only.
pub fn timeout(wait: impl Into<DurationMs>, action: Action, on_timeout: Action) -> Action {
    let wait = wait.into();
    let slot: Rc<OnceCell<WeakAction>> = Rc::new(OnceCell::new());
    let whole = Action::native("timeout", {
        let slot = slot.clone();
        move |m, input, success, failure| {
            let done = Rc::new(Cell::new(false));
            let me = slot
                .get()
                .and_then(WeakAction::upgrade)
                .map(Value::Act)
                .unwrap_or(Value::Nothing);
            let watchdog = {
                let done = done.clone();
                let on_timeout = on_timeout.clone();
                let success = success.clone();
                let failure = failure.clone();
                Action::native("timeout.watchdog", move |m2, me, _s, _f| {
                    if done.replace(true) {
                        return;
                    }
                    m2.call(&on_timeout, me, Some(success.clone()), Some(failure.clone()));
                })
            };
            m.delay(wait, &watchdog, me, None, None);
            let ok = settle_once(&done, &success);
            let err = settle_once(&done, &failure);
            m.call(&action, input, Some(ok), Some(err));
        }
    });
    slot.set(whole.downgrade()).ok();
    whole
}

fn settle_once(done: &Rc<Cell<bool>>, k: &Action) -> Action {
    let done = done.clone();
    let k = k.clone();
    Action::native("timeout.settle", move |m, v, _s, _f| {
        if !done.replace(true) {
            m.call(&k, v, None, None);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;
    use weir_kernel::test_utils::Recorder;
    use weir_kernel::{chain, pass, raise, Step};

    fn slow(wait: u64, out: &'static str) -> Action {
        chain(vec![crate::timer::delay(wait), crate::dataflow::supply(out)])
    }

    #[tokio::test(start_paused = true)]
    async fn fork_preserves_branch_order() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                let a = fork(vec![slow(30, "slowest"), slow(10, "fast"), slow(20, "middle")]);
                m.call(&a, Value::Nothing, Some(rec.sink()), None);
            }
        });
        local.await;
        assert_eq!(
            rec.values(),
            vec![Value::List(vec![
                Value::from("slowest"),
                Value::from("fast"),
                Value::from("middle"),
            ])]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fork_collects_mixed_outcomes_as_success() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                let a = fork(vec![pass(), raise("broken")]);
                m.call(&a, Value::from(1i64), Some(rec.sink()), None);
            }
        });
        local.await;
        let seen = rec.values();
        let results = seen[0].as_list().expect("a result list");
        assert_eq!(results[0], Value::from(1i64));
        let err = results[1].as_error().expect("the branch error");
        assert_eq!(err.payload(), Value::from("broken"));
    }

    #[tokio::test(start_paused = true)]
    async fn fork_all_failed_surfaces_a_representative() {
        let errs = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let errs = errs.clone();
            async move {
                let m = Orch::new();
                let a = fork(vec![raise("first"), raise("second")]);
                m.call(&a, Value::Nothing, None, Some(errs.sink()));
            }
        });
        local.await;
        let seen = errs.values();
        let err = seen[0].as_error().expect("an IoError");
        assert_eq!(err.payload(), Value::from("first"));
    }

    #[tokio::test(start_paused = true)]
    async fn any_first_success_wins() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                let a = any(vec![slow(50, "tortoise"), slow(5, "hare"), raise("scratched")]);
                m.call(&a, Value::Nothing, Some(rec.sink()), None);
            }
        });
        local.await;
        assert_eq!(rec.values(), vec![Value::from("hare")]);
    }

    #[tokio::test(start_paused = true)]
    async fn any_all_failed_raises() {
        let errs = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let errs = errs.clone();
            async move {
                let m = Orch::new();
                m.call(&any(vec![raise("a"), raise("b")]), Value::Nothing, None, Some(errs.sink()));
            }
        });
        local.await;
        let seen = errs.values();
        let err = seen[0].as_error().expect("an IoError");
        assert_eq!(err.payload(), Value::from(Condition::AllFailed));
    }

    #[test]
    fn alt_falls_back_in_order() {
        let m = Orch::new();
        let rec = Recorder::new();
        let a = alt(vec![raise("one"), raise("two"), pass()]);
        m.call(&a, Value::from("kept"), Some(rec.sink()), None);
        assert_eq!(rec.values(), vec![Value::from("kept")]);
    }

    #[test]
    fn alt_exhaustion_raises() {
        let m = Orch::new();
        let errs = Recorder::new();
        m.call(&alt(vec![raise("one")]), Value::Nothing, None, Some(errs.sink()));
        let seen = errs.values();
        let err = seen[0].as_error().expect("an IoError");
        assert_eq!(err.payload(), Value::from(Condition::AltExhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn tee_isolates_the_side_track() {
        let main = Recorder::new();
        let side = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let main = main.clone();
            let side = side.clone();
            async move {
                let m = Orch::new();
                let noisy = chain(vec![side.record(), raise("side failure")]);
                m.call(&tee(noisy), Value::from(3i64), Some(main.sink()), None);
            }
        });
        local.await;
        assert_eq!(main.values(), vec![Value::from(3i64)]);
        assert_eq!(side.values(), vec![Value::from(3i64)]);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_fires_after_the_count_is_exhausted() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                let rv = sync(2);
                m.call(&rv.now, Value::from("joined"), Some(rec.sink()), None);
                assert!(rec.is_empty(), "now parks until the count drains");
                m.run(Value::Nothing, &rv.later);
                m.run(Value::Nothing, &rv.later);
            }
        });
        local.await;
        assert_eq!(rec.values(), vec![Value::from("joined")]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_watchdog_hands_the_whole_action_to_the_handler() {
        let rec = Recorder::new();
        let attempts = Rc::new(Cell::new(0));
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            let attempts = attempts.clone();
            async move {
                let m = Orch::new();
                // Succeeds on the second attempt, fast enough to beat the
                // watchdog.
                let flaky = {
                    let attempts = attempts.clone();
                    Action::native("flaky", move |m, input, success, failure| {
                        let n = attempts.get() + 1;
                        attempts.set(n);
                        if n == 1 {
                            m.delay(100u64, &crate::dataflow::supply("ok"), input, Some(success), Some(failure));
                        } else {
                            m.delay(1u64, &crate::dataflow::supply("ok"), input, Some(success), Some(failure));
                        }
                    })
                };
                let retry = Action::native("retry-once", move |m, input, success, failure| {
                    if let Value::Act(op) = input {
                        m.call(&op, Value::Nothing, Some(success), Some(failure));
                    }
                });
                m.call(&timeout(10u64, flaky, retry), Value::Nothing, Some(rec.sink()), None);
            }
        });
        local.await;
        assert_eq!(rec.values(), vec![Value::from("ok")]);
        assert_eq!(attempts.get(), 2, "one timed-out attempt, one retry");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_suppresses_the_watchdog_on_completion() {
        let rec = Recorder::new();
        let fired = Rc::new(Cell::new(false));
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            let fired = fired.clone();
            async move {
                let m = Orch::new();
                let on_timeout = Action::pure("late", {
                    let fired = fired.clone();
                    move |v| {
                        fired.set(true);
                        Step::Next(v)
                    }
                });
                let a = timeout(50u64, slow(5, "prompt"), on_timeout);
                m.call(&a, Value::Nothing, Some(rec.sink()), None);
            }
        });
        local.await;
        assert_eq!(rec.values(), vec![Value::from("prompt")]);
        assert!(!fired.get());
    }
}
