//! The response channel: a connected `AF_UNIX`/`SOCK_STREAM` socket pair
//! carrying completed action-record pointers from worker threads back to
//! the response fiber.
//!
//! Each write is exactly one pointer (8 bytes on every platform this crate
//! targets), comfortably under `PIPE_BUF`, so concurrent writes from
//! different worker threads never interleave at the byte level — each
//! `write()` either lands whole or (per §7) is a fatal bug, never a torn
//! write. The read side is non-blocking; the response fiber parks on its
//! readability through the scheduler's fd-readiness primitive rather than
//! blocking a syscall here.

use crate::action::ActionRecord;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use wire_core::werror;

const PTR_BYTES: usize = std::mem::size_of::<u64>();

pub(crate) struct ResponseChannel {
    write_fd: OwnedFd,
    read_fd: OwnedFd,
}

impl ResponseChannel {
    /// Create the channel. Per spec, failure here is fatal — there is no
    /// safe continuation for an offload context with no response path —
    /// so this aborts the process rather than returning a `Result`.
    pub fn new() -> Self {
        let (a, b) = socketpair(AddressFamily::Unix, SockType::Stream, None, SockFlag::empty())
            .unwrap_or_else(|e| {
                werror!("wire-offload", "socketpair() failed: {e} — cannot continue");
                std::process::abort();
            });

        let read_fd: OwnedFd = b;
        let flags = fcntl(read_fd.as_raw_fd(), FcntlArg::F_GETFL).unwrap_or_else(|e| {
            werror!("wire-offload", "fcntl(F_GETFL) on response channel failed: {e}");
            std::process::abort();
        });
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        if let Err(e) = fcntl(read_fd.as_raw_fd(), FcntlArg::F_SETFL(flags)) {
            werror!("wire-offload", "fcntl(F_SETFL O_NONBLOCK) on response channel failed: {e}");
            std::process::abort();
        }

        Self { write_fd: a, read_fd }
    }

    #[inline]
    pub fn read_fd(&self) -> RawFd {
        self.read_fd.as_raw_fd()
    }

    /// Called from a worker thread after executing an action. A short or
    /// failed write here means a submitter is waiting for a wakeup that
    /// will never come — per §7 that is a bug serious enough to abort on,
    /// not one to retry or swallow.
    pub fn send(&self, ptr: *mut ActionRecord) {
        let bytes = (ptr as u64).to_ne_bytes();
        let n = unsafe {
            libc::write(self.write_fd.as_raw_fd(), bytes.as_ptr() as *const libc::c_void, PTR_BYTES)
        };
        if n != PTR_BYTES as isize {
            werror!(
                "worker",
                "response channel write failed (ret={n}, errno={}) — lost wakeup, aborting",
                errno()
            );
            std::process::abort();
        }
    }

    /// Non-blocking drain of up to `max` completions into `out`. Returns
    /// the number read. A short read (fewer than a full 8-byte pointer, or
    /// `EAGAIN`/`EWOULDBLOCK`) means the channel is caught up for now —
    /// that is the ordinary, expected way this function returns. Any other
    /// read failure, including EOF, is fatal per §7: nothing can produce a
    /// correct completion stream over a channel in that state.
    pub fn drain_into(&self, out: &mut Vec<*mut ActionRecord>, max: usize) -> usize {
        let mut count = 0;
        while count < max {
            let mut buf = [0u8; PTR_BYTES];
            let n = unsafe { libc::read(self.read_fd(), buf.as_mut_ptr() as *mut libc::c_void, PTR_BYTES) };
            if n == PTR_BYTES as isize {
                out.push(u64::from_ne_bytes(buf) as *mut ActionRecord);
                count += 1;
                continue;
            }
            if n == 0 {
                werror!("response-fiber", "response channel EOF — fatal, aborting");
                std::process::abort();
            }
            if n < 0 {
                let e = errno();
                if e == libc::EAGAIN || e == libc::EWOULDBLOCK {
                    break;
                }
                werror!("response-fiber", "response channel read failed: errno {e} — fatal, aborting");
                std::process::abort();
            }
            // A positive but partial (non-8-byte) read can't happen for a
            // stream of whole pointer-sized atomic writes; treat it the
            // same as any other channel corruption.
            werror!("response-fiber", "response channel short read ({n} bytes) — fatal, aborting");
            std::process::abort();
        }
        count
    }
}

fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}
