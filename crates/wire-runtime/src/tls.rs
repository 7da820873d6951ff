//! Thread-local flags the syscall shim layer consults.
//!
//! Exactly one OS thread is ever "the wire thread" for a given offload
//! context: the thread that runs the fiber scheduler's run loop. Worker
//! threads never touch fiber state and must see `is_wire_thread() == false`
//! so a shim running there takes the direct syscall path instead of trying
//! to recurse into the offload bridge.

use std::cell::Cell;
use wire_core::FiberId;

thread_local! {
    static IS_WIRE_THREAD: Cell<bool> = const { Cell::new(false) };
    static CURRENT_FIBER: Cell<u32> = const { Cell::new(wire_core::constants::FIBER_NONE) };
}

/// Set by the scheduler's bootstrap fiber the first time `block_on` runs on
/// this OS thread. Worker threads never call this, so it stays `false`
/// there for the lifetime of the process.
#[inline]
pub fn set_is_wire_thread(v: bool) {
    IS_WIRE_THREAD.with(|c| c.set(v));
}

/// Whether the calling OS thread is the one running the fiber scheduler.
#[inline]
pub fn is_wire_thread() -> bool {
    IS_WIRE_THREAD.with(|c| c.get())
}

#[inline]
pub(crate) fn set_current_fiber(id: FiberId) {
    CURRENT_FIBER.with(|c| c.set(id.as_u32()));
}

/// The fiber currently running on this OS thread, or `FiberId::NONE` when
/// called from the scheduler's own context (between fibers) or from a
/// worker thread.
#[inline]
pub fn current_fiber() -> FiberId {
    FiberId::new(CURRENT_FIBER.with(|c| c.get()))
}
