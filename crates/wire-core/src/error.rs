//! Error types shared by the scheduler and the offload core

use core::fmt;

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur in scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// No fiber slots available.
    NoSlotsAvailable,
    /// Scheduler not initialized.
    NotInitialized,
    /// Scheduler already initialized.
    AlreadyInitialized,
    /// A platform call (mmap, mprotect, epoll_ctl, ...) failed. Carries errno.
    Platform(i32),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::NoSlotsAvailable => write!(f, "no fiber slots available"),
            SchedError::NotInitialized => write!(f, "scheduler not initialized"),
            SchedError::AlreadyInitialized => write!(f, "scheduler already initialized"),
            SchedError::Platform(errno) => write!(f, "platform error: errno {}", errno),
        }
    }
}

impl std::error::Error for SchedError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            format!("{}", SchedError::Platform(2)),
            "platform error: errno 2"
        );
    }
}
