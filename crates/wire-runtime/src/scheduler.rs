//! The single-OS-thread cooperative fiber scheduler.
//!
//! Everything here runs on exactly one OS thread — the wire thread — and
//! the state lives in a thread-local, not a shared global: nothing else is
//! ever allowed to touch it, so there's no lock to take and no atomics to
//! reason about beyond what [`wire_core::Waker`] already provides for
//! cross-fiber/cross-thread handoffs.

use crate::arch::{self, SavedRegs};
use crate::fd::FdReadiness;
use crate::stack::Stack;
use crate::tls;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::os::unix::io::RawFd;
use wire_core::constants::{DEFAULT_STACK_SIZE, FIBER_NONE};
use wire_core::FiberId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FiberState {
    Ready,
    Blocked,
    Finished,
}

struct FiberSlot {
    regs: SavedRegs,
    stack: Stack,
    state: FiberState,
    /// True exactly while this fiber's id sits in `Inner::ready`. Lets
    /// [`resume`] no-op against a fiber that's already runnable-but-not-yet-
    /// run instead of pushing a second entry for the same id.
    enqueued: bool,
}

struct Inner {
    slots: Vec<Option<FiberSlot>>,
    free: Vec<u32>,
    ready: VecDeque<u32>,
    current: u32,
    sched_regs: SavedRegs,
    fd: Option<FdReadiness>,
    fd_waiters: HashMap<RawFd, u32>,
    bootstrap_done: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            ready: VecDeque::new(),
            current: FIBER_NONE,
            sched_regs: SavedRegs::default(),
            fd: None,
            fd_waiters: HashMap::new(),
            bootstrap_done: false,
        }
    }

    fn alloc_slot(&mut self, stack: Stack) -> u32 {
        let slot =
            FiberSlot { regs: SavedRegs::default(), stack, state: FiberState::Ready, enqueued: false };
        if let Some(id) = self.free.pop() {
            self.slots[id as usize] = Some(slot);
            id
        } else {
            self.slots.push(Some(slot));
            (self.slots.len() - 1) as u32
        }
    }

    fn slot_mut(&mut self, id: u32) -> Option<&mut FiberSlot> {
        self.slots.get_mut(id as usize).and_then(|s| s.as_mut())
    }

    fn regs_ptr(&mut self, id: u32) -> *mut SavedRegs {
        &mut self.slot_mut(id).expect("fiber slot must exist").regs as *mut SavedRegs
    }

    fn sched_regs_ptr(&mut self) -> *mut SavedRegs {
        &mut self.sched_regs as *mut SavedRegs
    }

    fn fd_readiness(&mut self) -> &FdReadiness {
        if self.fd.is_none() {
            self.fd = Some(FdReadiness::new().expect("epoll_create1 should not fail"));
        }
        self.fd.as_ref().unwrap()
    }
}

thread_local! {
    static SCHED: RefCell<Inner> = RefCell::new(Inner::new());
}

extern "C" fn call_closure<F: FnOnce() + 'static>(arg: usize) {
    let boxed = unsafe { Box::from_raw(arg as *mut F) };
    boxed();
}

/// Spawn a fiber. It is runnable as soon as something puts its id on the
/// ready queue — spawning alone does not schedule it (see [`resume`]).
pub fn spawn<F>(f: F) -> FiberId
where
    F: FnOnce() + 'static,
{
    let stack = Stack::new(DEFAULT_STACK_SIZE).expect("fiber stack allocation should not fail");
    let boxed = Box::new(f);
    let arg = Box::into_raw(boxed) as usize;
    let entry_fn = call_closure::<F> as usize;

    let id = SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        let id = inner.alloc_slot(stack);
        let slot = inner.slot_mut(id).unwrap();
        let top = slot.stack.top();
        unsafe { arch::init_context(&mut slot.regs, top, entry_fn, arg) };
        id
    });
    FiberId::new(id)
}

/// Make `fiber` runnable. Safe to call from any fiber running on the wire
/// thread (submission path, response fiber) — never from a worker thread.
///
/// Idempotent against a fiber that's already enqueued-but-not-yet-run: a
/// second `resume` before the first has been picked up by [`run_loop`] is a
/// no-op rather than a duplicate entry in the ready queue. This matters for
/// callers like `wire_offload::init`, which may run from inside an
/// already-running fiber and resume the same response fiber a caller is
/// also about to resume via the submission path, before either resume has
/// had a chance to actually run it.
pub fn resume(fiber: FiberId) {
    if fiber.is_none() {
        return;
    }
    SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        let should_enqueue = match inner.slot_mut(fiber.as_u32()) {
            Some(slot) if !slot.enqueued => {
                slot.state = FiberState::Ready;
                slot.enqueued = true;
                true
            }
            _ => false,
        };
        if should_enqueue {
            inner.ready.push_back(fiber.as_u32());
        }
    });
}

/// Suspend the calling fiber. It will not run again until some other fiber
/// calls [`resume`] on its id.
pub fn suspend() {
    let (old, new) = SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        let id = inner.current;
        inner.slot_mut(id).expect("suspend called outside a fiber").state = FiberState::Blocked;
        (inner.regs_ptr(id), inner.sched_regs_ptr())
    });
    unsafe { arch::context_switch_voluntary(old, new) };
}

/// Give up the CPU but stay runnable — re-enqueued at the back of the
/// ready queue before switching away.
pub fn yield_now() {
    let (old, new) = SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        let id = inner.current;
        let slot = inner.slot_mut(id).expect("yield_now called outside a fiber");
        slot.state = FiberState::Ready;
        slot.enqueued = true;
        inner.ready.push_back(id);
        (inner.regs_ptr(id), inner.sched_regs_ptr())
    });
    unsafe { arch::context_switch_voluntary(old, new) };
}

/// Park the calling fiber until `fd` becomes readable.
pub fn fd_wait_read(fd: RawFd) {
    let id = SCHED.with(|s| s.borrow().current);
    SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        inner.fd_readiness().add_read(fd, fd as u64).expect("epoll_ctl add should not fail");
        inner.fd_waiters.insert(fd, id);
    });
    suspend();
}

/// Drop interest in `fd` without parking anything on it (used when a
/// response fiber fully detaches).
pub fn fd_detach(fd: RawFd) {
    SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        if let Some(fdr) = inner.fd.as_ref() {
            let _ = fdr.remove(fd);
        }
        inner.fd_waiters.remove(&fd);
    });
}

/// Called only from the trampoline's cleanup call when a fiber's entry
/// function returns. Never returns to its caller.
pub(crate) fn finish_current() {
    let (old, new) = SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        let id = inner.current;
        inner.slot_mut(id).expect("finish_current called outside a fiber").state =
            FiberState::Finished;
        (inner.regs_ptr(id), inner.sched_regs_ptr())
    });
    unsafe { arch::context_switch_voluntary(old, new) };
    unreachable!("a finished fiber's slot must never be resumed");
}

fn switch_to(id: u32) {
    let (old, new) = SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        inner.current = id;
        (inner.sched_regs_ptr(), inner.regs_ptr(id))
    });
    tls::set_current_fiber(FiberId::new(id));
    unsafe { arch::context_switch_voluntary(old, new) };
    tls::set_current_fiber(FiberId::NONE);

    SCHED.with(|s| {
        let mut inner = s.borrow_mut();
        inner.current = FIBER_NONE;
        if matches!(inner.slot_mut(id).map(|s| s.state), Some(FiberState::Finished)) {
            inner.slots[id as usize] = None;
            inner.free.push(id);
        }
    });
}

fn ensure_bootstrap() {
    let done = SCHED.with(|s| s.borrow().bootstrap_done);
    if done {
        return;
    }
    let id = spawn(|| tls::set_is_wire_thread(true));
    switch_to(id.as_u32());
    SCHED.with(|s| s.borrow_mut().bootstrap_done = true);
}

fn run_loop() {
    loop {
        let next = SCHED.with(|s| {
            let mut inner = s.borrow_mut();
            let id = inner.ready.pop_front();
            if let Some(id) = id {
                if let Some(slot) = inner.slot_mut(id) {
                    slot.enqueued = false;
                }
            }
            id
        });
        if let Some(id) = next {
            switch_to(id);
            continue;
        }

        let waiting = SCHED.with(|s| !s.borrow().fd_waiters.is_empty());
        if !waiting {
            break;
        }

        let fired = SCHED.with(|s| {
            let mut inner = s.borrow_mut();
            inner.fd_readiness().wait(-1)
        });
        SCHED.with(|s| {
            let mut inner = s.borrow_mut();
            for token in fired {
                if let Some(id) = inner.fd_waiters.remove(&(token as RawFd)) {
                    if let Some(slot) = inner.slot_mut(id) {
                        slot.state = FiberState::Ready;
                        slot.enqueued = true;
                    }
                    inner.ready.push_back(id);
                }
            }
        });
    }
}

/// Run `root` to completion as a fiber, along with every fiber it (directly
/// or transitively) spawns, until the scheduler is fully idle: no runnable
/// fibers, and nothing parked on an fd.
pub fn block_on<F>(root: F)
where
    F: FnOnce() + 'static,
{
    ensure_bootstrap();
    let id = spawn(root);
    resume(id);
    run_loop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn runs_a_single_fiber_to_completion() {
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        block_on(move || {
            ran2.set(true);
        });
        assert!(ran.get());
    }

    #[test]
    fn yields_give_other_fibers_a_turn() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = order.clone();
        let b = order.clone();
        block_on(move || {
            let other = spawn(move || {
                b.borrow_mut().push("b");
            });
            resume(other);
            yield_now();
            a.borrow_mut().push("a");
        });
        assert_eq!(*order.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn suspend_waits_for_explicit_resume() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = order.clone();
        let b = order.clone();
        let waiter_id = Rc::new(Cell::new(FiberId::NONE));
        let waiter_id2 = waiter_id.clone();
        block_on(move || {
            let waiter = spawn(move || {
                b.borrow_mut().push("waiter-parked");
                suspend();
                b.borrow_mut().push("waiter-resumed");
            });
            waiter_id2.set(waiter);
            resume(waiter);
            yield_now();
            a.borrow_mut().push("main");
            resume(waiter_id2.get());
        });
        assert_eq!(*order.borrow(), vec!["waiter-parked", "main", "waiter-resumed"]);
    }

    #[test]
    fn is_wire_thread_becomes_true_after_bootstrap() {
        block_on(|| {
            assert!(tls::is_wire_thread());
        });
    }

    #[test]
    fn double_resume_before_first_run_does_not_double_enqueue() {
        // Mirrors `wire_offload::init` resuming its response fiber, then a
        // submission on the same (not-yet-run) fiber resuming it again
        // before `run_loop` has switched to it even once. Without the
        // `enqueued` guard this pushes the fiber's id twice, and the second
        // `switch_to` lands on a slot `finish_current` already freed.
        let runs = Rc::new(Cell::new(0));
        let runs2 = runs.clone();
        block_on(move || {
            let other = spawn(move || {
                runs2.set(runs2.get() + 1);
            });
            resume(other);
            resume(other);
            yield_now();
        });
        assert_eq!(runs.get(), 1);
    }
}
