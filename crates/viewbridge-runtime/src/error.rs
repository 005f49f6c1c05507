//! Runtime error types.

use thiserror::Error;

/// Errors returned by [`RuntimeHandle`](crate::RuntimeHandle) operations.
///
/// Both mean the manager task is gone; a stopped runtime never restarts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The command channel is closed
    #[error("runtime has shut down")]
    Closed,

    /// The manager task stopped before answering
    #[error("runtime dropped the request for {0}")]
    NoAnswer(&'static str),
}
