//! Single-threaded tick and timer queue.
//!
//! Ticks run in FIFO order before any timer. Timers run on a virtual clock:
//! when no tick is queued the clock jumps straight to the earliest timer, so
//! `run` never sleeps the thread and ordering stays deterministic.

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;

use tracing::trace;

use crate::deferred::Deferred;
use crate::value::Value;

type Task = Box<dyn FnOnce()>;

struct Timer {
    due: u64,
    seq: u64,
    task: Task,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

#[derive(Default)]
struct LoopState {
    ticks: VecDeque<Task>,
    timers: BinaryHeap<Reverse<Timer>>,
    now: u64,
    seq: u64,
}

/// Handle to a shared event loop. Clones share the same queues.
#[derive(Clone, Default)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run on the next tick.
    pub fn next_tick(&self, task: impl FnOnce() + 'static) {
        self.state.borrow_mut().ticks.push_back(Box::new(task));
    }

    /// Queue `task` to run `delay_ms` virtual milliseconds from now.
    pub fn set_timeout(&self, delay_ms: u64, task: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        let seq = state.seq;
        state.seq += 1;
        let due = state.now + delay_ms;
        state.timers.push(Reverse(Timer {
            due,
            seq,
            task: Box::new(task),
        }));
    }

    /// A deferred that fulfils with `value` after `delay_ms`.
    pub fn sleep(&self, delay_ms: u64, value: impl Into<Value>) -> Deferred {
        let value = value.into();
        Deferred::new(|resolver| {
            self.set_timeout(delay_ms, move || resolver.resolve(value));
        })
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    pub fn is_idle(&self) -> bool {
        let state = self.state.borrow();
        state.ticks.is_empty() && state.timers.is_empty()
    }

    /// Run queued work until both queues are empty. Returns the number of
    /// tasks executed.
    pub fn run(&self) -> usize {
        let mut executed = 0;
        while let Some(task) = self.pop() {
            task();
            executed += 1;
        }
        trace!(executed, "event loop drained");
        executed
    }

    fn pop(&self) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        if let Some(task) = state.ticks.pop_front() {
            return Some(task);
        }
        let Reverse(timer) = state.timers.pop()?;
        state.now = state.now.max(timer.due);
        Some(timer.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_run_before_timers_in_order() {
        let lp = EventLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        lp.set_timeout(10, move || l.borrow_mut().push("t10"));
        let l = Rc::clone(&log);
        lp.set_timeout(5, move || l.borrow_mut().push("t5"));
        let l = Rc::clone(&log);
        lp.next_tick(move || l.borrow_mut().push("tick"));

        assert_eq!(lp.run(), 3);
        assert_eq!(*log.borrow(), vec!["tick", "t5", "t10"]);
        assert_eq!(lp.now(), 10);
        assert!(lp.is_idle());
    }

    #[test]
    fn test_sleep_settles_when_timer_fires() {
        let lp = EventLoop::new();
        let d = lp.sleep(5, "done");
        assert!(!d.is_settled());
        lp.run();
        assert_eq!(d.peek(), Some(Ok(Value::from("done"))));
    }
}
