//! Single-resolution deferred values.
//!
//! A `Deferred` starts pending and settles at most once, either fulfilled or
//! rejected. Continuations registered with [`Deferred::then`] before
//! settlement run synchronously inside the settling call; continuations
//! registered afterwards run immediately. Nothing here schedules work on an
//! event loop; that is the trampoline's job.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use crate::error::RuntimeError;
use crate::value::Value;

/// Outcome of a settled deferred: `Ok` when fulfilled, `Err` when rejected.
pub type Settlement = Result<Value, Value>;

type Continuation = Box<dyn FnOnce(Settlement)>;

enum State {
    Pending,
    Settled(Settlement),
}

struct Inner {
    state: State,
    // Almost always zero or one waiter: the routine that yielded it.
    waiters: SmallVec<[Continuation; 1]>,
}

/// A single-resolution deferred value.
///
/// Cloning is cheap and every clone observes the same settlement.
#[derive(Clone)]
pub struct Deferred {
    inner: Rc<RefCell<Inner>>,
}

impl Deferred {
    /// Create a deferred and run `producer` synchronously with its resolver.
    pub fn new(producer: impl FnOnce(Resolver)) -> Self {
        let (deferred, resolver) = Deferred::pending();
        producer(resolver);
        deferred
    }

    /// A pending deferred and the resolver that settles it.
    pub fn pending() -> (Deferred, Resolver) {
        let inner = Rc::new(RefCell::new(Inner {
            state: State::Pending,
            waiters: SmallVec::new(),
        }));
        (
            Deferred {
                inner: Rc::clone(&inner),
            },
            Resolver { inner },
        )
    }

    pub fn resolved(value: impl Into<Value>) -> Self {
        Deferred::settled(Ok(value.into()))
    }

    pub fn rejected(error: impl Into<Value>) -> Self {
        Deferred::settled(Err(error.into()))
    }

    fn settled(settlement: Settlement) -> Self {
        Deferred {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Settled(settlement),
                waiters: SmallVec::new(),
            })),
        }
    }

    /// Register a continuation for the settlement.
    ///
    /// Runs `f` now if already settled, otherwise when the resolver fires.
    pub fn then(&self, f: impl FnOnce(Settlement) + 'static) {
        match self.peek() {
            Some(settlement) => f(settlement),
            None => self.inner.borrow_mut().waiters.push(Box::new(f)),
        }
    }

    /// The settlement, if there is one yet.
    pub fn peek(&self) -> Option<Settlement> {
        match &self.inner.borrow().state {
            State::Settled(settlement) => Some(settlement.clone()),
            State::Pending => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.inner.borrow().state, State::Settled(_))
    }

    /// Whether both handles refer to the same deferred.
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(Ok(v)) => write!(f, "Deferred(fulfilled: {v})"),
            Some(Err(e)) => write!(f, "Deferred(rejected: {e})"),
            None => f.write_str("Deferred(pending)"),
        }
    }
}

/// Settles one `Deferred`.
///
/// Clones share the same target. Only the first settlement through any clone
/// takes effect; later ones are ignored.
#[derive(Clone)]
pub struct Resolver {
    inner: Rc<RefCell<Inner>>,
}

impl Resolver {
    pub fn resolve(&self, value: impl Into<Value>) {
        self.settle(Ok(value.into()));
    }

    pub fn reject(&self, error: impl Into<Value>) {
        self.settle(Err(error.into()));
    }

    /// Settle, ignoring the attempt if already settled.
    pub fn settle(&self, settlement: Settlement) {
        if self.try_settle(settlement).is_err() {
            trace!("ignoring second settlement of a deferred");
        }
    }

    /// Settle, reporting an attempt to settle twice.
    pub fn try_settle(&self, settlement: Settlement) -> Result<(), RuntimeError> {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            if let State::Settled(_) = inner.state {
                return Err(RuntimeError::AlreadySettled);
            }
            inner.state = State::Settled(settlement.clone());
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            waiter(settlement.clone());
        }
        Ok(())
    }

    /// The deferred this resolver settles.
    pub fn deferred(&self) -> Deferred {
        Deferred {
            inner: Rc::clone(&self.inner),
        }
    }
}
