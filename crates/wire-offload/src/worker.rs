//! The worker pool: fixed set of OS threads draining the submission queue.
//!
//! Each worker blocks all signals on entry — the wire thread is the sole
//! signal recipient, standard practice for any runtime mixing a
//! cooperative scheduler with a background OS thread pool — then loops
//! forever: pop, execute, respond. Workers never touch fiber state beyond
//! a record's `Waker` field, and even that only indirectly (the response
//! fiber is the one that calls `.resume()` on it); dispatch here is pure
//! "run the syscall, write the result".

use crate::action::{ActionKind, ActionRecord};
use crate::context::OffloadContext;
use nix::sys::signal::{self, SigSet, SigmaskHow};
use std::sync::Arc;
use wire_core::{werror, wwarn};

pub(crate) fn run(ctx: Arc<OffloadContext>, worker_id: usize) {
    if let Err(e) = block_all_signals() {
        werror!(
            "worker",
            "worker[{worker_id}] failed to block signals: {e} — continuing anyway, \
             but a signal delivered here could perturb the wire thread's discipline"
        );
    }

    loop {
        let item = match ctx.queue.pop() {
            Some(item) => item,
            // Defensive: pop() only returns None after an explicit
            // shutdown(), which this bridge never calls (no first-class
            // teardown). Tolerated rather than asserted.
            None => {
                wwarn!("worker", "worker[{worker_id}] queue popped empty after shutdown, exiting");
                return;
            }
        };

        // SAFETY: the submitting fiber is parked on this record's waker
        // until the response fiber resumes it, which happens only after
        // this worker hands the pointer to the response channel below.
        // No other thread touches the record between pop() and send().
        let record = unsafe { &mut *item.0 };
        execute(record);
        ctx.channel.send(item.0);
    }
}

fn block_all_signals() -> Result<(), nix::Error> {
    let all = SigSet::all();
    signal::pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&all), None)
}

/// The central dispatch function: switch on a record's discriminant, run
/// the real syscall with its packed inputs, and write the result plus
/// `errno` into the record's outputs. Pure marshalling — no retries, no
/// interpretation of the result.
pub(crate) fn execute(record: &mut ActionRecord) {
    let ret: i64 = match &record.kind {
        ActionKind::Open { path, flags, mode } => unsafe {
            libc::open(path.as_ptr(), *flags, *mode as libc::mode_t) as i64
        },
        ActionKind::Read { fd, buf, len } => unsafe {
            libc::read(*fd, *buf as *mut libc::c_void, *len) as i64
        },
        ActionKind::Write { fd, buf, len } => unsafe {
            libc::write(*fd, *buf as *const libc::c_void, *len) as i64
        },
        ActionKind::Close { fd } => unsafe { libc::close(*fd) as i64 },
        ActionKind::Stat { path, out } => unsafe { libc::stat(path.as_ptr(), *out) as i64 },
        ActionKind::Fstat { fd, out } => unsafe { libc::fstat(*fd, *out) as i64 },
        ActionKind::Lseek { fd, offset, whence } => unsafe {
            libc::lseek(*fd, *offset, *whence) as i64
        },
        ActionKind::Unlink { path } => unsafe { libc::unlink(path.as_ptr()) as i64 },
        ActionKind::Mkdir { path, mode } => unsafe {
            libc::mkdir(path.as_ptr(), *mode as libc::mode_t) as i64
        },
        ActionKind::Rmdir { path } => unsafe { libc::rmdir(path.as_ptr()) as i64 },
        ActionKind::Rename { from, to } => unsafe { libc::rename(from.as_ptr(), to.as_ptr()) as i64 },
        ActionKind::Connect { fd, addr, addrlen } => unsafe {
            let addr_ptr = addr as *const libc::sockaddr_storage as *const libc::sockaddr;
            libc::connect(*fd, addr_ptr, *addrlen) as i64
        },
        ActionKind::Accept { fd } => unsafe {
            libc::accept(*fd, std::ptr::null_mut(), std::ptr::null_mut()) as i64
        },
        ActionKind::Send { fd, buf, len, flags } => unsafe {
            libc::send(*fd, *buf as *const libc::c_void, *len, *flags) as i64
        },
        ActionKind::Recv { fd, buf, len, flags } => unsafe {
            libc::recv(*fd, *buf as *mut libc::c_void, *len, *flags) as i64
        },
        ActionKind::PRead { fd, buf, len, offset } => unsafe {
            libc::pread(*fd, *buf as *mut libc::c_void, *len, *offset) as i64
        },
        ActionKind::PWrite { fd, buf, len, offset } => unsafe {
            libc::pwrite(*fd, *buf as *const libc::c_void, *len, *offset) as i64
        },
        // Returns the real dispatcher result rather than discarding it —
        // see DESIGN.md.
        ActionKind::Ioctl { fd, request, arg } => unsafe { libc::ioctl(*fd, *request, *arg) as i64 },
    };

    record.result = ret;
    record.errno = if ret < 0 { errno() } else { 0 };
}

fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}
