//! The offload context: the process-wide singleton tying the submission
//! queue, the worker pool, and the response fiber together.
//!
//! Created once by [`init`] and lives for the process's remaining lifetime —
//! there is no first-class shutdown path, matching the response fiber's own
//! unreachable-after-loop shutdown code (see `response.rs`).

use crate::action::ActionRecord;
use crate::channel::ResponseChannel;
use crate::config::OffloadConfig;
use crate::error::{OffloadError, Result};
use crate::queue::SubmissionQueue;
use crate::{response, worker};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use wire_core::{winfo, FiberId};

pub(crate) struct OffloadContext {
    pub(crate) config: OffloadConfig,
    pub(crate) queue: SubmissionQueue,
    pub(crate) channel: ResponseChannel,
    /// Submitted-but-not-yet-resumed action count.
    /// Touched only from the wire thread (submitters, the response fiber);
    /// an atomic buys us a `Sync` context struct without a lock, not
    /// cross-thread coordination.
    pub(crate) num_active_ios: AtomicUsize,
    response_fiber: AtomicU32,
}

impl OffloadContext {
    pub(crate) fn response_fiber(&self) -> FiberId {
        FiberId::new(self.response_fiber.load(Ordering::Acquire))
    }
}

static CONTEXT: OnceLock<Arc<OffloadContext>> = OnceLock::new();

pub(crate) fn get() -> Option<Arc<OffloadContext>> {
    CONTEXT.get().cloned()
}

/// Construct the offload context: create the response socket pair, spawn
/// `n_workers` worker OS threads, and spawn the response fiber into the
/// calling thread's scheduler state.
///
/// Must be called from the thread that will become the wire thread — i.e.
/// before (or from within) that thread's call into `wire_runtime::block_on`
/// — since spawning the response fiber touches that thread's thread-local
/// scheduler state directly. Calling a second time is rejected rather than
/// silently ignored or silently replacing the first context (see
/// `OffloadError::AlreadyInitialized`'s doc comment for why).
pub fn init(n_workers: usize) -> Result<()> {
    if CONTEXT.get().is_some() {
        return Err(OffloadError::AlreadyInitialized);
    }

    let config = OffloadConfig::new(n_workers);
    winfo!(
        "wire-offload",
        "init: {} workers, queue_capacity={}, response_batch={}",
        config.n_workers,
        config.queue_capacity,
        config.response_batch
    );

    let queue_capacity = config.queue_capacity;
    let ctx = Arc::new(OffloadContext {
        config,
        queue: SubmissionQueue::new(queue_capacity),
        channel: ResponseChannel::new(),
        num_active_ios: AtomicUsize::new(0),
        response_fiber: AtomicU32::new(wire_core::constants::FIBER_NONE),
    });

    for worker_id in 0..ctx.config.n_workers {
        let worker_ctx = ctx.clone();
        thread::Builder::new()
            .name(format!("wire-offload-worker-{worker_id}"))
            .spawn(move || worker::run(worker_ctx, worker_id))
            .map_err(|e| OffloadError::Platform(e.raw_os_error().unwrap_or(0)))?;
    }

    let resp_ctx = ctx.clone();
    let fiber = wire_runtime::spawn(move || response::run(resp_ctx));
    ctx.response_fiber.store(fiber.as_u32(), Ordering::Release);
    wire_runtime::resume(fiber);

    CONTEXT.set(ctx).map_err(|_| OffloadError::AlreadyInitialized)?;
    Ok(())
}

/// Submitted-but-not-yet-resumed action count, zero if the offload context
/// has not been initialized.
pub fn active_io_count() -> usize {
    get().map(|ctx| ctx.num_active_ios.load(Ordering::Acquire)).unwrap_or(0)
}

/// Build a bare record and run it through [`worker::execute`] directly,
/// without a queue, worker, or response fiber in the loop. Used by the
/// syscall shims when called from a thread that is not the wire thread —
/// most commonly a worker thread itself, which must not recurse into the
/// offload path.
pub(crate) fn execute_direct(kind: crate::action::ActionKind) -> (i64, i32) {
    let mut record = ActionRecord::new(kind);
    worker::execute(&mut record);
    (record.result, record.errno)
}
