//! Runtime for rewritten yieldify routines.
//!
//! This crate provides the execution side of yieldify:
//! - `Value` - The dynamic values that flow between routines
//! - `Deferred` / `Resolver` - Single-resolution deferred values
//! - `EventLoop` - A single-threaded tick and timer queue
//! - `Trampoline` / `Routine` / `SuspendableFn` - The step driver
//! - `catch_callback` - Adapts error-first callbacks into deferreds
//!
//! Everything here is single-threaded and uses `Rc`, matching the
//! cooperative model of the code it drives.

pub mod error;
pub use error::RuntimeError;

// Dynamic value model
pub mod value;
pub use value::Value;

// Single-resolution deferred values
pub mod deferred;
pub use deferred::{Deferred, Resolver, Settlement};

// Tick and timer queue
pub mod event_loop;
pub use event_loop::EventLoop;

// Step driver
pub mod trampoline;
pub use trampoline::{Resume, Routine, RuntimeOptions, Step, SuspendableFn, Trampoline};

// Callback adaptation
pub mod callback;
pub use callback::{Callback, catch_callback, normalize_callback_args};


#[cfg(test)]
mod trampoline_tests;

#[cfg(test)]
mod callback_tests;
