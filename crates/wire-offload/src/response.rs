//! The response fiber: drains the response channel, resumes waiters, and
//! parks when idle.
//!
//! Two distinct parking modes make up the `Draining` / `FdParked` /
//! `FullySuspended` state machine:
//!
//! - `FdParked`: tied to the event loop's readiness engine via
//!   [`wire_runtime::fd_wait_read`] — correct while I/O is outstanding,
//!   because the process must not look idle to the scheduler.
//! - `FullySuspended`: detaches the response channel fd entirely and
//!   [`wire_runtime::suspend`]s — the only way the host runtime can ever
//!   see true quiescence and exit, since an fd still registered with the
//!   readiness engine keeps the run loop from declaring "nothing to wait
//!   for" (see `wire_runtime::scheduler::run_loop`).
//!
//! The loop never exits: there is no first-class teardown for the offload
//! context, so the code after it would be unreachable and isn't written.

use crate::context::OffloadContext;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn run(ctx: Arc<OffloadContext>) {
    let batch_size = ctx.config.response_batch;
    let mut batch = Vec::with_capacity(batch_size);

    loop {
        batch.clear();
        let n = ctx.channel.drain_into(&mut batch, batch_size);

        for &ptr in &batch {
            // SAFETY: this pointer was handed to us by a worker that is
            // done writing `result`/`errno`; the submitter is parked and
            // will not touch the record again until we resume it below.
            let record = unsafe { &*ptr };
            if let Some(fiber) = record.waker.resume() {
                wire_runtime::resume(fiber);
            }
            // Decremented before the end-of-batch quiescence check below,
            // so that check sees the true post-batch count.
            ctx.num_active_ios.fetch_sub(1, Ordering::AcqRel);
        }

        if n < batch_size {
            // A short (or empty) read means the channel is caught up for
            // now (`EAGAIN`/`EWOULDBLOCK`, the ordinary way this read
            // returns) — decide whether to park fully or on fd readiness.
            if ctx.num_active_ios.load(Ordering::Acquire) == 0 {
                wire_runtime::fd_detach(ctx.channel.read_fd());
                wire_runtime::suspend();
            } else {
                wire_runtime::fd_wait_read(ctx.channel.read_fd());
            }
        }
        // A full batch (n == batch_size) loops straight back into another
        // drain attempt without parking — there may be more waiting.
    }
}
