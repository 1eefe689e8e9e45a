//! Native CLI support for the yieldify binary.

pub mod args;
pub mod driver;
pub mod reporter;
pub mod watch;

#[cfg(test)]
#[path = "tests/args_tests.rs"]
mod args_tests;
#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod driver_tests;
#[cfg(test)]
#[path = "tests/reporter_tests.rs"]
mod reporter_tests;
#[cfg(test)]
#[path = "tests/watch_tests.rs"]
mod watch_tests;
