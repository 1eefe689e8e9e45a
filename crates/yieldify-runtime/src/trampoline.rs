//! The step driver for suspendable routines.
//!
//! A routine is anything that can be resumed with a value (or an error) and
//! reports what it did next: yielded a value, returned, or threw. The
//! trampoline owns the loop that feeds each yielded value back in:
//!
//! - a plain value is fed straight back;
//! - a settled deferred feeds back its value, or throws its rejection into
//!   the routine so that `try/catch` around the suspension point works;
//! - a pending deferred parks the routine until it settles.
//!
//! Synchronous steps are counted. When the count reaches the step budget the
//! rest of the routine is moved to the next event-loop tick, even if the next
//! value is already available. That keeps long synchronous runs from starving
//! other routines and bounds native stack growth when settlements chain.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use yieldify_common::limits::TRAMPOLINE_STEP_BUDGET;

use crate::deferred::{Deferred, Resolver, Settlement};
use crate::error::RuntimeError;
use crate::event_loop::EventLoop;
use crate::value::Value;

/// How a routine is resumed.
#[derive(Clone, Debug, PartialEq)]
pub enum Resume {
    /// Continue with the value of the last suspension point.
    Next(Value),
    /// Throw at the last suspension point.
    Throw(Value),
}

impl From<Settlement> for Resume {
    fn from(settlement: Settlement) -> Self {
        match settlement {
            Ok(value) => Resume::Next(value),
            Err(error) => Resume::Throw(error),
        }
    }
}

/// What a routine did after being resumed.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Yielded(Value),
    Returned(Value),
    Threw(Value),
}

/// A suspendable routine: the iterator side of a generator.
///
/// The first resume is always `Resume::Next(Value::Undefined)`. A routine is
/// never resumed again after it returned or threw.
pub trait Routine {
    fn resume(&mut self, input: Resume) -> Step;
}

impl<F> Routine for F
where
    F: FnMut(Resume) -> Step,
{
    fn resume(&mut self, input: Resume) -> Step {
        self(input)
    }
}

/// Trampoline settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeOptions {
    /// Synchronous steps before deferring to the next tick.
    pub step_budget: u32,
    /// Reject the routine's deferred when it throws uncaught, instead of
    /// logging and leaving it pending.
    pub reject_uncaught: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions {
            step_budget: TRAMPOLINE_STEP_BUDGET,
            reject_uncaught: false,
        }
    }
}

/// Drives routines on an event loop.
#[derive(Clone, Default)]
pub struct Trampoline {
    event_loop: EventLoop,
    options: RuntimeOptions,
}

impl Trampoline {
    pub fn new(event_loop: EventLoop, options: RuntimeOptions) -> Self {
        Trampoline {
            event_loop,
            options,
        }
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Start driving `routine` and return the deferred for its result.
    ///
    /// The routine runs synchronously until it parks on a pending deferred,
    /// exhausts its step budget, or finishes.
    pub fn spawn(&self, routine: Box<dyn Routine>) -> Deferred {
        let (deferred, resolver) = Deferred::pending();
        let driver = Rc::new(RefCell::new(Driver {
            routine,
            steps: 0,
            resolver,
            trampoline: self.clone(),
        }));
        Driver::advance(&driver, Resume::Next(Value::Undefined));
        deferred
    }

    /// Wrap a routine factory so that each call starts a fresh routine and
    /// returns its deferred.
    pub fn run_generator<F>(&self, factory: F) -> SuspendableFn
    where
        F: Fn(Vec<Value>) -> Box<dyn Routine> + 'static,
    {
        SuspendableFn {
            trampoline: self.clone(),
            factory: Rc::new(factory),
        }
    }
}

/// A routine factory bound to a trampoline.
#[derive(Clone)]
pub struct SuspendableFn {
    trampoline: Trampoline,
    factory: Rc<dyn Fn(Vec<Value>) -> Box<dyn Routine>>,
}

impl SuspendableFn {
    pub fn call(&self, args: Vec<Value>) -> Deferred {
        let routine = (self.factory)(args);
        self.trampoline.spawn(routine)
    }
}

struct Driver {
    routine: Box<dyn Routine>,
    steps: u32,
    resolver: Resolver,
    trampoline: Trampoline,
}

type SharedDriver = Rc<RefCell<Driver>>;

impl Driver {
    fn advance(this: &SharedDriver, mut input: Resume) {
        loop {
            let step = {
                let Ok(mut driver) = this.try_borrow_mut() else {
                    error!("{}", RuntimeError::Reentrant);
                    return;
                };
                driver.steps += 1;
                driver.routine.resume(input)
            };

            let next = match step {
                Step::Yielded(Value::Deferred(deferred)) => match deferred.peek() {
                    Some(settlement) => Resume::from(settlement),
                    None => {
                        trace!("routine parked on a pending deferred");
                        this.borrow_mut().steps = 0;
                        let this = Rc::clone(this);
                        deferred.then(move |settlement| {
                            Driver::advance(&this, Resume::from(settlement));
                        });
                        return;
                    }
                },
                Step::Yielded(value) => Resume::Next(value),
                Step::Returned(value) => {
                    Driver::finish(this, value);
                    return;
                }
                Step::Threw(err) => {
                    Driver::fail(this, err);
                    return;
                }
            };

            if Driver::over_budget(this) {
                trace!("step budget exhausted, deferring to next tick");
                let event_loop = this.borrow().trampoline.event_loop.clone();
                let this = Rc::clone(this);
                event_loop.next_tick(move || Driver::advance(&this, next));
                return;
            }
            input = next;
        }
    }

    fn over_budget(this: &SharedDriver) -> bool {
        let mut driver = this.borrow_mut();
        if driver.steps >= driver.trampoline.options.step_budget {
            driver.steps = 0;
            true
        } else {
            false
        }
    }

    fn finish(this: &SharedDriver, value: Value) {
        let resolver = this.borrow().resolver.clone();
        match value {
            // A settled deferred is unwrapped here; a pending one is adopted.
            Value::Deferred(deferred) => match deferred.peek() {
                Some(settlement) => resolver.settle(settlement),
                None => deferred.then(move |settlement| resolver.settle(settlement)),
            },
            value => resolver.resolve(value),
        }
    }

    fn fail(this: &SharedDriver, err: Value) {
        let driver = this.borrow();
        error!("{}", RuntimeError::Uncaught(err.to_string()));
        if driver.trampoline.options.reject_uncaught {
            let resolver = driver.resolver.clone();
            drop(driver);
            resolver.reject(err);
        } else {
            debug!("leaving routine result pending after uncaught error");
        }
    }
}
