//! Tests for the trampoline step driver

use std::cell::RefCell;
use std::rc::Rc;

use crate::deferred::Deferred;
use crate::event_loop::EventLoop;
use crate::trampoline::{Resume, Routine, RuntimeOptions, Step, Trampoline};
use crate::value::Value;

fn routine(f: impl FnMut(Resume) -> Step + 'static) -> Box<dyn Routine> {
    Box::new(f)
}

fn setup() -> (EventLoop, Trampoline) {
    let lp = EventLoop::new();
    let trampoline = Trampoline::new(lp.clone(), RuntimeOptions::default());
    (lp, trampoline)
}

/// Yields each of `yields` in turn, then returns whatever it was resumed with.
fn yield_then_return(yields: Vec<Value>) -> Box<dyn Routine> {
    let mut pending = yields.into_iter();
    routine(move |input| match input {
        Resume::Throw(err) => Step::Threw(err),
        Resume::Next(value) => match pending.next() {
            Some(next) => Step::Yielded(next),
            None => Step::Returned(value),
        },
    })
}

// =============================================================================
// Synchronous fast paths
// =============================================================================

#[test]
fn test_immediate_return_settles_synchronously() {
    let (_lp, trampoline) = setup();
    let d = trampoline.spawn(routine(|_| Step::Returned(Value::from("hi"))));
    assert_eq!(d.peek(), Some(Ok(Value::from("hi"))));
}

#[test]
fn test_plain_and_settled_values_are_fed_back() {
    let (_lp, trampoline) = setup();
    let d = trampoline.spawn(yield_then_return(vec![
        Value::from(1),
        Deferred::resolved("settled").into(),
    ]));
    assert_eq!(d.peek(), Some(Ok(Value::from("settled"))));
}

#[test]
fn test_returned_settled_deferred_is_unwrapped() {
    let (_lp, trampoline) = setup();
    let d = trampoline.spawn(routine(|_| {
        Step::Returned(Deferred::resolved(7).into())
    }));
    assert_eq!(d.peek(), Some(Ok(Value::from(7))));
}

// =============================================================================
// Asynchronous resumption
// =============================================================================

#[test]
fn test_sleep_result_flows_back_after_timer() {
    let (lp, trampoline) = setup();
    let timer = lp.clone();
    let d = trampoline.spawn(yield_then_return(vec![timer.sleep(5, "done").into()]));

    assert!(!d.is_settled());
    lp.run();
    assert_eq!(d.peek(), Some(Ok(Value::from("done"))));
    assert_eq!(lp.now(), 5);
}

#[test]
fn test_returned_pending_deferred_is_adopted() {
    let (lp, trampoline) = setup();
    let later = lp.sleep(3, 42);
    let d = trampoline.spawn(routine(move |_| Step::Returned(later.clone().into())));

    assert!(!d.is_settled());
    lp.run();
    assert_eq!(d.peek(), Some(Ok(Value::from(42))));
}

#[test]
fn test_routines_interleave_at_suspension_points() {
    let (lp, trampoline) = setup();
    let order = Rc::new(RefCell::new(Vec::new()));

    for (name, delay) in [("slow", 10u64), ("fast", 1u64)] {
        let timer = lp.clone();
        let order = Rc::clone(&order);
        let mut started = false;
        trampoline.spawn(routine(move |_| {
            if !started {
                started = true;
                return Step::Yielded(timer.sleep(delay, name).into());
            }
            order.borrow_mut().push(name);
            Step::Returned(Value::Undefined)
        }));
    }

    lp.run();
    assert_eq!(*order.borrow(), vec!["fast", "slow"]);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_rejection_is_thrown_into_routine_and_can_be_caught() {
    let (_lp, trampoline) = setup();
    let mut started = false;
    let d = trampoline.spawn(routine(move |input| {
        if !started {
            started = true;
            return Step::Yielded(Deferred::rejected(Value::error("boom")).into());
        }
        match input {
            Resume::Throw(Value::Error(msg)) => Step::Returned(Value::from(format!("caught {msg}"))),
            other => Step::Returned(Value::from(format!("unexpected {other:?}"))),
        }
    }));
    assert_eq!(d.peek(), Some(Ok(Value::from("caught boom"))));
}

#[test]
fn test_caught_error_lets_routine_continue_suspending() {
    let (lp, trampoline) = setup();
    let timer = lp.clone();
    let mut stage = 0;
    let d = trampoline.spawn(routine(move |input| {
        stage += 1;
        match (stage, input) {
            (1, _) => Step::Yielded(Deferred::rejected(Value::error("first")).into()),
            (2, Resume::Throw(_)) => Step::Yielded(timer.sleep(2, "after").into()),
            (3, Resume::Next(v)) => Step::Returned(v),
            (_, other) => Step::Threw(Value::error(format!("bad resume {other:?}"))),
        }
    }));
    lp.run();
    assert_eq!(d.peek(), Some(Ok(Value::from("after"))));
}

#[test]
fn test_uncaught_error_leaves_result_pending() {
    let (lp, trampoline) = setup();
    let d = trampoline.spawn(routine(|_| Step::Threw(Value::error("oops"))));
    lp.run();
    assert!(!d.is_settled());
}

#[test]
fn test_uncaught_error_rejects_when_configured() {
    let lp = EventLoop::new();
    let options = RuntimeOptions {
        reject_uncaught: true,
        ..RuntimeOptions::default()
    };
    let trampoline = Trampoline::new(lp, options);
    let d = trampoline.spawn(routine(|_| Step::Threw(Value::error("oops"))));
    assert_eq!(d.peek(), Some(Err(Value::error("oops"))));
}

// =============================================================================
// Step budget
// =============================================================================

#[test]
fn test_step_budget_defers_to_next_tick() {
    let (lp, trampoline) = setup();
    let d = trampoline.spawn(yield_then_return(vec![Value::from(0); 250]));

    assert!(!d.is_settled());
    assert!(!lp.is_idle());
    lp.run();
    assert!(d.is_settled());
}

#[test]
fn test_one_million_synchronous_steps() {
    let (lp, trampoline) = setup();
    let mut count = 0u32;
    let d = trampoline.spawn(routine(move |_| {
        if count == 1_000_000 {
            return Step::Returned(Value::from(f64::from(count)));
        }
        count += 1;
        Step::Yielded(Deferred::resolved(f64::from(count)).into())
    }));
    lp.run();
    assert_eq!(d.peek(), Some(Ok(Value::from(1_000_000.0))));
}

#[test]
fn test_run_generator_passes_arguments() {
    let (_lp, trampoline) = setup();
    let add = trampoline.run_generator(|args| {
        let sum: f64 = args.iter().filter_map(Value::as_number).sum();
        routine(move |_| Step::Returned(Value::from(sum)))
    });
    assert_eq!(
        add.call(vec![Value::from(2), Value::from(3)]).peek(),
        Some(Ok(Value::from(5)))
    );
    assert_eq!(add.call(vec![]).peek(), Some(Ok(Value::from(0))));
}
