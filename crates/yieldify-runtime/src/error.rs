//! Runtime error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A resolver was used after its deferred had already settled.
    #[error("deferred is already settled")]
    AlreadySettled,

    /// A routine's driver was re-entered while it was still stepping.
    #[error("routine resumed while it was already running")]
    Reentrant,

    /// A routine threw and nothing inside it caught the error.
    #[error("uncaught error in routine: {0}")]
    Uncaught(String),
}
