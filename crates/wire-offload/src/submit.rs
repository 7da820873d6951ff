//! The submission path: called from an arbitrary caller fiber, this is the
//! only place that enqueues an action and parks on its completion.

use crate::action::{ActionKind, ActionPtr, ActionRecord};
use crate::context::OffloadContext;
use std::sync::atomic::Ordering;

/// Submit `kind` and block the calling fiber until a worker has executed
/// it. Returns `(result, errno)` exactly as the worker's dispatch wrote
/// them — never retried, never reinterpreted.
///
/// # Panics
///
/// Panics if called from outside a fiber (there is no caller to park).
/// Every syscall shim only reaches this path when
/// `wire_runtime::is_wire_thread()` is true, which implies a fiber is
/// current.
pub(crate) fn submit(ctx: &OffloadContext, kind: ActionKind) -> (i64, i32) {
    let record = Box::new(ActionRecord::new(kind));
    let ptr = Box::into_raw(record);

    // Enqueue first — the record must already be reachable to a worker
    // before we touch the "is the response fiber idle" predicate below,
    // or a worker could finish and the response fiber could (in some
    // future multi-wire-thread extension) find nothing to report.
    ctx.queue.push(ActionPtr(ptr));

    // fetch_add returns the pre-increment value, so this single atomic op
    // is simultaneously the "was it zero before this call?" check and the
    // increment — deliberately combined: the counter is consulted, then
    // bumped, in one op.
    if ctx.num_active_ios.fetch_add(1, Ordering::AcqRel) == 0 {
        // The response fiber parked itself fully detached (FullySuspended)
        // precisely because it had nothing to wait for; nothing else will
        // wake it, so we must resume it explicitly.
        wire_runtime::resume(ctx.response_fiber());
    }

    let me = wire_runtime::current_fiber();
    // SAFETY: `ptr` is valid until we reclaim it via Box::from_raw below,
    // which only happens after park()/suspend() returns — i.e. after the
    // worker and response fiber are done touching it.
    let already_signalled = unsafe { (*ptr).waker.park(me) };
    if !already_signalled {
        wire_runtime::suspend();
    }

    // SAFETY: reclaiming exclusive ownership here is sound precisely
    // because the wait above cannot return before the worker has written
    // `result`/`errno` and the response fiber has resumed `me` — nothing
    // else holds a reference to `ptr` at this point.
    let record = unsafe { Box::from_raw(ptr) };
    (record.result, record.errno)
}
