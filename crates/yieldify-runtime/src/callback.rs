//! Callback-to-deferred adaptation.
//!
//! Rewritten code turns `fs.readFile(path, (0))` into a call to
//! `catchCallback`: the original function is invoked with a synthetic
//! callback in place of the marker, and the returned deferred settles with
//! whatever that callback receives, normalised by [`normalize_callback_args`].

use tracing::trace;

use crate::deferred::{Deferred, Resolver};
use crate::value::Value;

/// One-shot callback handed to an adapted function.
///
/// Invoking consumes it, so a function can only ever answer once.
pub struct Callback {
    resolver: Resolver,
}

impl Callback {
    pub fn invoke(self, args: Vec<Value>) {
        let value = normalize_callback_args(args);
        trace!(%value, "callback invoked");
        self.resolver.resolve(value);
    }
}

/// Map callback arguments to a single value.
///
/// - no arguments: `undefined`
/// - one argument: that argument
/// - `(null, value)`: `value` (error-first with no error)
/// - first argument is an error: that error
/// - anything else: the full argument list
pub fn normalize_callback_args(mut args: Vec<Value>) -> Value {
    match args.len() {
        0 => Value::Undefined,
        1 => args.remove(0),
        2 if args[0].is_null() => args.remove(1),
        _ if args[0].is_error() => args.remove(0),
        _ => Value::list(args),
    }
}

/// Call `f` with a fresh [`Callback`] and return a deferred for its answer.
///
/// If `f` itself fails before answering, the deferred is rejected with the
/// error.
pub fn catch_callback<F>(f: F) -> Deferred
where
    F: FnOnce(Callback) -> Result<(), Value>,
{
    Deferred::new(|resolver| {
        let callback = Callback {
            resolver: resolver.clone(),
        };
        if let Err(err) = f(callback) {
            resolver.reject(err);
        }
    })
}
