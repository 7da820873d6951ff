//! The action record: the unit of work that crosses from a fiber to a
//! worker thread and back.
//!
//! Each record is heap-allocated at submission time (`Box::into_raw`) and
//! freed by the response fiber once its result has been delivered back to
//! the waiting fiber. Between those two points ownership is exclusive and
//! single-threaded in sequence — the submitting fiber writes `kind`, a
//! worker thread is the only one to write `result`/`errno`, and the
//! response fiber is the only one to read them back — so no lock or atomic
//! guards the payload fields themselves. The `Waker` is the one field two
//! parties touch concurrently, and it is built for exactly that.
//!
//! This is a closed sum type rather than a generic syscall-number-plus-argv
//! table: each variant captures its inputs by value, typed, which is also
//! what lets [`crate::worker::execute`] dispatch with a `match` instead of
//! an FFI `syscall()` call with a six-slot argument array.

use std::ffi::CString;
use std::os::unix::io::RawFd;
use wire_core::Waker;

/// One offloaded POSIX operation, with its inputs captured by value.
///
/// Buffer arguments are raw pointers: the worker thread executing the real
/// syscall runs in the same process and address space as the fiber that
/// submitted it, and that fiber's stack (where the buffer usually lives)
/// is guaranteed not to move or be reused until the fiber is resumed with
/// the result — which cannot happen before the worker is done with it.
pub enum ActionKind {
    Open { path: CString, flags: i32, mode: u32 },
    Read { fd: RawFd, buf: *mut u8, len: usize },
    Write { fd: RawFd, buf: *const u8, len: usize },
    Close { fd: RawFd },
    Stat { path: CString, out: *mut libc::stat },
    Fstat { fd: RawFd, out: *mut libc::stat },
    Lseek { fd: RawFd, offset: i64, whence: i32 },
    Unlink { path: CString },
    Mkdir { path: CString, mode: u32 },
    Rmdir { path: CString },
    Rename { from: CString, to: CString },
    Connect { fd: RawFd, addr: libc::sockaddr_storage, addrlen: libc::socklen_t },
    Accept { fd: RawFd },
    Send { fd: RawFd, buf: *const u8, len: usize, flags: i32 },
    Recv { fd: RawFd, buf: *mut u8, len: usize, flags: i32 },
    PRead { fd: RawFd, buf: *mut u8, len: usize, offset: i64 },
    PWrite { fd: RawFd, buf: *const u8, len: usize, offset: i64 },
    Ioctl { fd: RawFd, request: libc::c_ulong, arg: usize },
}

// SAFETY: a record's buffer pointers are only ever dereferenced by the one
// worker thread executing it, handed off exclusively via the submission
// queue; no two threads touch them at once.
unsafe impl Send for ActionKind {}

pub struct ActionRecord {
    pub kind: ActionKind,
    pub waker: Waker,
    pub result: i64,
    pub errno: i32,
}

impl ActionRecord {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, waker: Waker::new(), result: -1, errno: 0 }
    }
}

/// A `*mut ActionRecord` that is safe to hand to another OS thread exactly
/// once, by construction of the submission/response protocol: the pointer
/// is pushed onto the submission queue by the submitting fiber and not
/// touched again until a worker thread pops it, and is pushed onto the
/// response channel by that worker and not touched again until the
/// response fiber reads it back.
#[derive(Clone, Copy)]
pub(crate) struct ActionPtr(pub *mut ActionRecord);

unsafe impl Send for ActionPtr {}
