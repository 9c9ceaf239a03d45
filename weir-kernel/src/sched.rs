//! Scheduler primitives.
//!
//! The kernel is single-threaded and cooperative: apparent concurrency
//! comes from breaking continuations across scheduler turns, never from
//! threads. The micro-task primitive is `tokio::task::spawn_local` on a
//! current-thread `LocalSet` — continuations are `Rc`-shared and
//! deliberately `!Send`, so the multi-threaded spawn is unusable by
//! construction. Timers are `tokio::time`, which also gives tests paused
//! virtual time for free.

use crate::duration::DurationMs;

/// Run a job on the next scheduler turn.
///
/// Must be called from within a `LocalSet` context — inside
/// [`run_local`], or inside a test's `LocalSet`.
pub fn next_tick(job: impl FnOnce() + 'static) {
    tokio::task::spawn_local(async move { job() });
}

/// Run a job after a delay. A zero delay defers to the next tick
/// without arming a timer.
pub fn after(wait: DurationMs, job: impl FnOnce() + 'static) {
    if wait.is_zero() {
        next_tick(job);
        return;
    }
    tokio::task::spawn_local(async move {
        tokio::time::sleep(wait.to_std()).await;
        job();
    });
}

/// Build a current-thread runtime, run `entry` on a fresh `LocalSet`,
/// and block until every task it transitively spawns has completed.
///
/// This is the process entry point for driving an action graph to
/// quiescence: `entry` typically calls [`Orch::run`](crate::Orch::run)
/// one or more times and returns immediately; the side effects drive
/// completion.
pub fn run_local(entry: impl FnOnce() + 'static) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let tasks = tokio::task::LocalSet::new();
    tasks.spawn_local(async move { entry() });
    runtime.block_on(tasks);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn run_local_drives_to_quiescence() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let inner = Rc::new(Cell::new(0));
        let i = inner.clone();
        run_local(move || {
            h.set(h.get() + 1);
            next_tick(move || {
                i.set(i.get() + 1);
            });
        })
        .unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(inner.get(), 1, "spawned ticks run before run_local returns");
    }

    #[test]
    fn after_zero_is_a_tick_not_a_timer() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        run_local(move || {
            after(DurationMs::ZERO, move || o1.borrow_mut().push("deferred"));
            o2.borrow_mut().push("sync");
        })
        .unwrap();
        assert_eq!(order.borrow().as_slice(), &["sync", "deferred"]);
    }
}
