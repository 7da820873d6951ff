//! Errors the offload bridge can return.
//!
//! Most of this bridge's failure modes are *not* recoverable — a torn
//! response channel or a failed socket-pair at startup leaves the offload
//! context in a state with no safe continuation, and those paths call
//! `abort()` directly (see `channel.rs`, `context.rs`) rather than
//! returning a `Result` nobody could usefully handle. `OffloadError` only
//! covers the handful of failures a caller can reasonably recover from.

use core::fmt;

pub type Result<T> = std::result::Result<T, OffloadError>;

#[derive(Debug)]
pub enum OffloadError {
    /// `init()` was called a second time. Rejected rather than silently
    /// ignored: a second call with a different `n_workers` almost always
    /// indicates a caller bug, and silently keeping the first context
    /// would hide it.
    AlreadyInitialized,
    /// `init()` was not called, or failed, before offload use.
    NotInitialized,
    /// A platform call the caller can plausibly retry or report failed.
    Platform(i32),
}

impl fmt::Display for OffloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffloadError::AlreadyInitialized => write!(f, "offload context already initialized"),
            OffloadError::NotInitialized => write!(f, "offload context not initialized"),
            OffloadError::Platform(errno) => write!(f, "platform error: errno {}", errno),
        }
    }
}

impl std::error::Error for OffloadError {}
