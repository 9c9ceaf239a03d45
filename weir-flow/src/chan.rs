//! CSP-style channels.
//!
//! A channel is two FIFOs: items waiting for receivers and receivers
//! waiting for items. `send` enqueues and flushes; `recv` takes the
//! front item or parks. Paired deliveries ride a zero delay, so receipt
//! is always ordered after the enclosing send's continuation returns.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use weir_kernel::{Action, DurationMs, Orch, Value};

struct ChanState {
    items: RefCell<VecDeque<Value>>,
    waiters: RefCell<VecDeque<(Orch, Action)>>,
}

/// A rendezvous channel between independent action sequences.
///
/// Clones share the same queues. The multiset of values delivered to
/// all receivers equals the multiset sent — nothing is lost or
/// duplicated; with multiple receivers, per-receiver ordering is
/// unspecified.
#[derive(Clone)]
pub struct Channel {
    state: Rc<ChanState>,
}

/// A fresh channel.
pub fn chan() -> Channel {
    Channel {
        state: Rc::new(ChanState {
            items: RefCell::new(VecDeque::new()),
            waiters: RefCell::new(VecDeque::new()),
        }),
    }
}

impl Channel {
    /// An action that sends its input into the channel and passes the
    /// input through to success.
    pub fn send(&self) -> Action {
        let state = self.state.clone();
        Action::native("chan.send", move |m, input, success, _f| {
            state.items.borrow_mut().push_back(input.clone());
            flush(&state);
            m.call(&success, input, None, None);
        })
    }

    /// An action that receives the next value from the channel,
    /// parking until one arrives. The received value replaces the
    /// inbound input.
    pub fn recv(&self) -> Action {
        let state = self.state.clone();
        Action::native("chan.recv", move |m, _input, success, _f| {
            flush(&state);
            let item = state.items.borrow_mut().pop_front();
            match item {
                Some(v) => m.call(&success, v, None, None),
                None => state.waiters.borrow_mut().push_back((m.clone(), success)),
            }
        })
    }

    /// How many sent values are still undelivered.
    pub fn backlog(&self) -> usize {
        self.state.items.borrow().len()
    }

    /// How many receivers are parked.
    pub fn parked(&self) -> usize {
        self.state.waiters.borrow().len()
    }
}

fn flush(state: &Rc<ChanState>) {
    loop {
        let pair = {
            let mut items = state.items.borrow_mut();
            let mut waiters = state.waiters.borrow_mut();
            if items.is_empty() || waiters.is_empty() {
                None
            } else {
                let v = items.pop_front();
                let w = waiters.pop_front();
                v.zip(w)
            }
        };
        let Some((v, (orch, parked))) = pair else {
            break;
        };
        orch.delay(DurationMs::ZERO, &parked, v, None, None);
    }
}
