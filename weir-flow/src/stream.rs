//! Generators and streams.
//!
//! A generator floods its downstream: it emits values in a loop and
//! relies on two brakes. The burst budget yields to the scheduler every
//! `buffer_capacity` emissions so a fast producer cannot starve other
//! work, and the pause handshake parks the loop when a bounded consumer
//! raises a [`PauseSignal`] — the rejected value is queued for replay,
//! so resuming loses nothing. Any other failure coming back up
//! propagates out of the generator.
//!
//! End-of-stream is the producer returning `None`; the generator then
//! stops without touching either continuation.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use weir_kernel::{sched, Action, DurationMs, Orch, PauseSignal, Value};

type Producer = Box<dyn FnMut() -> Option<Value>>;

struct PumpState {
    producer: RefCell<Producer>,
    rest: DurationMs,
    paused: Cell<bool>,
    running: Cell<bool>,
    replay: RefCell<VecDeque<Value>>,
}

impl PumpState {
    fn new(producer: Producer, rest: DurationMs) -> Rc<Self> {
        Rc::new(Self {
            producer: RefCell::new(producer),
            rest,
            paused: Cell::new(false),
            running: Cell::new(false),
            replay: RefCell::new(VecDeque::new()),
        })
    }
}

/// A generator over `producer`, yielding for `rest` between bursts.
///
/// Each produced value is emitted into the downstream success
/// continuation; `None` ends the stream. All invocations of the
/// returned action share one producer.
pub fn generate(
    producer: impl FnMut() -> Option<Value> + 'static,
    rest: impl Into<DurationMs>,
) -> Action {
    let state = PumpState::new(Box::new(producer), rest.into());
    Action::native("gen", move |m, _input, success, failure| {
        pump(m, state.clone(), success, failure);
    })
}

fn pump(m: &Orch, state: Rc<PumpState>, success: Action, failure: Action) {
    if state.running.replace(true) {
        return;
    }
    let budget = m.config().buffer_capacity;
    let mut emitted = 0;
    loop {
        if state.paused.get() {
            break;
        }
        if emitted >= budget {
            let m2 = m.clone();
            let state2 = state.clone();
            let success = success.clone();
            let failure = failure.clone();
            sched::after(state.rest, move || pump(&m2, state2, success, failure));
            break;
        }
        let item = {
            let replayed = state.replay.borrow_mut().pop_front();
            replayed.or_else(|| {
                let mut producer = state.producer.borrow_mut();
                (*producer)()
            })
        };
        let Some(v) = item else {
            break;
        };
        let brake = {
            let state = state.clone();
            let failure = failure.clone();
            let success = success.clone();
            let v = v.clone();
            Action::native("gen.brake", move |m2, fault, _s, _f| match fault {
                Value::Pause(p) => {
                    state.paused.set(true);
                    state.replay.borrow_mut().push_back(v.clone());
                    let m2 = m2.clone();
                    let state = state.clone();
                    let success = success.clone();
                    let failure = failure.clone();
                    p.on_resume(move || {
                        state.paused.set(false);
                        pump(&m2, state, success, failure);
                    });
                }
                other => m2.call(&failure, other, None, None),
            })
        };
        m.call(&success, v, None, Some(brake));
        emitted += 1;
    }
    state.running.set(false);
}

/// Immediately raise a fresh [`PauseSignal`] to the failure
/// continuation. The building block for custom backpressure bridges.
pub fn pause() -> Action {
    Action::native("pause", |m, _input, _s, failure| {
        m.call(&failure, Value::Pause(PauseSignal::new()), None, None);
    })
}

/// Emit each of `items` once, in order.
pub fn spray(items: Vec<Value>) -> Action {
    Action::native("spray", move |m, _input, success, failure| {
        let items = items.clone();
        let index = Cell::new(0);
        let state = PumpState::new(
            Box::new(move || {
                let i = index.get();
                index.set(i + 1);
                items.get(i).cloned()
            }),
            DurationMs::ZERO,
        );
        pump(m, state, success, failure);
    })
}

/// Emit the elements of the invocation input (a list, or a JSON array)
/// once, in order.
pub fn spray_input() -> Action {
    Action::native("spray", move |m, input, success, failure| {
        let items = enumerable(&input);
        let index = Cell::new(0);
        let state = PumpState::new(
            Box::new(move || {
                let i = index.get();
                index.set(i + 1);
                items.get(i).cloned()
            }),
            DurationMs::ZERO,
        );
        pump(m, state, success, failure);
    })
}

/// Emit `items` forever, wrapping around. An empty sequence ends
/// immediately.
pub fn cycle(items: Vec<Value>) -> Action {
    Action::native("cycle", move |m, _input, success, failure| {
        let items = items.clone();
        let index = Cell::new(0usize);
        let state = PumpState::new(
            Box::new(move || {
                if items.is_empty() {
                    return None;
                }
                let i = index.get();
                index.set((i + 1) % items.len());
                items.get(i).cloned()
            }),
            DurationMs::ZERO,
        );
        pump(m, state, success, failure);
    })
}

/// Like [`cycle`], over the invocation input.
pub fn cycle_input() -> Action {
    Action::native("cycle", move |m, input, success, failure| {
        let items = enumerable(&input);
        let index = Cell::new(0usize);
        let state = PumpState::new(
            Box::new(move || {
                if items.is_empty() {
                    return None;
                }
                let i = index.get();
                index.set((i + 1) % items.len());
                items.get(i).cloned()
            }),
            DurationMs::ZERO,
        );
        pump(m, state, success, failure);
    })
}

fn enumerable(input: &Value) -> Vec<Value> {
    match input {
        Value::List(items) => items.clone(),
        Value::Json(serde_json::Value::Array(items)) => {
            items.iter().cloned().map(Value::Json).collect()
        }
        _ => Vec::new(),
    }
}

/// Emit the numeric sequence `from, from + step, …`, stopping before
/// `to`; unbounded when `to` is `None`.
pub fn enum_from(from: i64, step: i64, to: impl Into<Option<i64>>) -> Action {
    let to = to.into();
    Action::native("enum", move |m, _input, success, failure| {
        let next = Cell::new(from);
        let state = PumpState::new(
            Box::new(move || {
                let n = next.get();
                if let Some(end) = to {
                    let exhausted = if step >= 0 { n >= end } else { n <= end };
                    if exhausted {
                        return None;
                    }
                }
                next.set(n + step);
                Some(Value::from(n))
            }),
            DurationMs::ZERO,
        );
        pump(m, state, success, failure);
    })
}

/// Accumulate inputs; terminate when `until` holds.
///
/// A non-terminal input is appended and the running list is delivered
/// to success. The terminal input is *not* appended — the accumulated
/// list is sent to the drain sink and the sequence stops.
pub fn collect_until(until: impl Fn(&Value) -> bool + 'static) -> Action {
    collecting(move |v| until(v))
}

/// Accumulate inputs; terminate on the absent value.
pub fn collect_until_end() -> Action {
    collecting(Value::is_nothing)
}

fn collecting(until: impl Fn(&Value) -> bool + 'static) -> Action {
    let gathered: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
    Action::native("collect", move |m, input, success, _f| {
        if until(&input) {
            let done = std::mem::take(&mut *gathered.borrow_mut());
            m.call(&Action::drain(), Value::List(done), None, None);
            return;
        }
        gathered.borrow_mut().push(input);
        let running = gathered.borrow().clone();
        m.call(&success, Value::List(running), None, None);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;
    use weir_kernel::test_utils::Recorder;
    use weir_kernel::{chain, Config, Orch};

    fn ints(rec: &Recorder) -> Vec<i64> {
        rec.values().iter().map(|v| v.as_i64().unwrap()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn enum_emits_the_half_open_range() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                m.run(Value::Nothing, &chain(vec![enum_from(1, 1, 6), rec.record()]));
            }
        });
        local.await;
        assert_eq!(ints(&rec), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn spray_enumerates_its_items() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                let items = vec![Value::from("a"), Value::from("b")];
                m.run(Value::Nothing, &chain(vec![spray(items), rec.record()]));
            }
        });
        local.await;
        assert_eq!(rec.values(), vec![Value::from("a"), Value::from("b")]);
    }

    #[tokio::test(start_paused = true)]
    async fn spray_input_enumerates_the_inbound_list() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                let a = chain(vec![spray_input(), rec.record()]);
                m.run(Value::Json(serde_json::json!([10, 20])), &a);
            }
        });
        local.await;
        assert_eq!(ints(&rec), vec![10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_budget_yields_between_bursts() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::with_config(Config {
                    buffer_capacity: 4,
                    ..Config::default()
                });
                m.run(Value::Nothing, &chain(vec![enum_from(0, 1, 10), rec.record()]));
                // The first burst lands synchronously; the rest follows
                // on later turns.
                assert_eq!(rec.len(), 4);
            }
        });
        local.await;
        assert_eq!(ints(&rec), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_wraps_until_paused_or_dropped() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                // A downstream pause brakes the cycle after five items.
                let brake = {
                    let seen = Cell::new(0);
                    Action::native("five-then-pause", move |m, input, success, failure| {
                        seen.set(seen.get() + 1);
                        if seen.get() > 5 {
                            m.call(&failure, Value::Pause(PauseSignal::new()), None, None);
                        } else {
                            m.call(&success, input, None, None);
                        }
                    })
                };
                let items = vec![Value::from("x"), Value::from("y")];
                m.run(Value::Nothing, &chain(vec![cycle(items), brake, rec.record()]));
            }
        });
        local.await;
        assert_eq!(
            rec.values(),
            vec![
                Value::from("x"),
                Value::from("y"),
                Value::from("x"),
                Value::from("y"),
                Value::from("x"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_parks_the_generator_and_resume_replays() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        let signal: Rc<RefCell<Option<PauseSignal>>> = Rc::new(RefCell::new(None));
        local.spawn_local({
            let rec = rec.clone();
            let signal = signal.clone();
            async move {
                let m = Orch::new();
                let gate = {
                    let signal = signal.clone();
                    let admitted = Cell::new(0);
                    Action::native("gate", move |m, input, success, failure| {
                        admitted.set(admitted.get() + 1);
                        if admitted.get() == 3 {
                            let p = PauseSignal::new();
                            *signal.borrow_mut() = Some(p.clone());
                            m.call(&failure, Value::Pause(p), None, None);
                        } else {
                            m.call(&success, input, None, None);
                        }
                    })
                };
                m.run(Value::Nothing, &chain(vec![enum_from(0, 1, 5), gate, rec.record()]));
                // Two delivered, the third rejected with a pause.
                assert_eq!(rec.len(), 2);
                signal.borrow().as_ref().unwrap().resume();
            }
        });
        local.await;
        assert_eq!(ints(&rec), vec![0, 1, 2, 3, 4], "the rejected item is replayed");
    }

    #[tokio::test(start_paused = true)]
    async fn collect_until_terminates_without_delivering() {
        let rec = Recorder::new();
        let local = LocalSet::new();
        local.spawn_local({
            let rec = rec.clone();
            async move {
                let m = Orch::new();
                let a = chain(vec![
                    enum_from(1, 1, 4),
                    collect_until(|v| v.as_i64() == Some(3)),
                    rec.record(),
                ]);
                m.run(Value::Nothing, &a);
            }
        });
        local.await;
        assert_eq!(
            rec.values(),
            vec![
                Value::List(vec![Value::from(1i64)]),
                Value::List(vec![Value::from(1i64), Value::from(2i64)]),
            ]
        );
    }
}
