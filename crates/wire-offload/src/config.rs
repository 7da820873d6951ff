//! Offload context configuration.
//!
//! `n_workers` is the one knob spec'd as required; the rest are
//! diagnostics/tuning knobs with safe defaults, overridable via environment
//! variables read once at [`crate::init`]. `WIRE_WORKERS`, if set, overrides
//! the `n_workers` argument passed to [`crate::init`] — handy for tuning a
//! deployed binary without a rebuild.

use wire_core::env::env_get;

#[derive(Debug, Clone)]
pub struct OffloadConfig {
    /// Fixed size of the worker thread pool. Two or more is recommended —
    /// one worker means a single in-flight blocking call stalls every other
    /// offloaded call until it returns.
    pub n_workers: usize,
    /// Soft high-water mark for the submission queue. The queue itself is
    /// unbounded (a `VecDeque`) and never rejects a push; crossing this
    /// mark only logs a `wwarn!` line from [`crate::queue::SubmissionQueue::push`]
    /// so an operator can notice the workers falling behind before the
    /// process runs out of memory.
    pub queue_capacity: usize,
    /// Max action-record pointers the response fiber reads per `read()` on
    /// the response channel before yielding back to the ready queue.
    pub response_batch: usize,
}

impl OffloadConfig {
    pub fn new(n_workers: usize) -> Self {
        Self {
            n_workers: env_get("WIRE_WORKERS", n_workers).max(1),
            queue_capacity: env_get("WIRE_QUEUE_CAPACITY", 4096),
            response_batch: env_get("WIRE_RESPONSE_BATCH", 128),
        }
    }
}
