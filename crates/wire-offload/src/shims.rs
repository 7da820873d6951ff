//! The syscall shim layer: one thin entry point per offloaded syscall. Each
//! shim is pure marshalling — build an [`ActionKind`], hand it to the
//! dispatch helper, unpack the result — and preserves the wrapped call's
//! semantics verbatim, including short reads/writes; nothing here loops to
//! finish a partial transfer.
//!
//! Every shim routes through [`dispatch`], which consults
//! `wire_runtime::is_wire_thread()` to decide offload vs. direct execution:
//! a call arriving from a worker thread must not recurse into the
//! submission path, since the worker *is* the thing that would have to
//! service it.
//!
//! Variadic POSIX entry points (`open`, `mkdir`, `ioctl`) are re-exposed as
//! ordinary, typed, non-variadic functions rather than reproduced as
//! variadics — the natural shape for a non-C target. LD_PRELOAD-style
//! interposition is out of scope here.

use crate::action::ActionKind;
use crate::context::{self, OffloadContext};
use crate::error::OffloadError;
use crate::submit;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;
use std::sync::Arc;

fn cstring(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains an interior NUL byte"))
}

fn as_io_result(result: i64, errno: i32) -> io::Result<i64> {
    if result < 0 {
        Err(io::Error::from_raw_os_error(errno))
    } else {
        Ok(result)
    }
}

/// Route `kind` through the offload bridge if we're on the wire thread, or
/// run it directly on the calling thread otherwise — a call from a worker
/// must not recurse into the offload path, and this is also what lets
/// application code call these shims before a [`crate::init`]'d runtime
/// exists, e.g. in single-threaded setup code.
fn dispatch(kind: ActionKind) -> io::Result<i64> {
    if wire_runtime::is_wire_thread() {
        let ctx: Arc<OffloadContext> =
            context::get().ok_or(OffloadError::NotInitialized).map_err(io::Error::other)?;
        let (result, errno) = submit::submit(&ctx, kind);
        as_io_result(result, errno)
    } else {
        let (result, errno) = context::execute_direct(kind);
        as_io_result(result, errno)
    }
}

/// `open(2)`. `mode` is always passed through; harmless when `flags`
/// doesn't include `O_CREAT`.
pub fn open(path: &Path, flags: i32, mode: u32) -> io::Result<RawFd> {
    let path = cstring(path)?;
    dispatch(ActionKind::Open { path, flags, mode }).map(|r| r as RawFd)
}

/// `read(2)`. No partial-read loop: short reads are returned verbatim.
pub fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    dispatch(ActionKind::Read { fd, buf: buf.as_mut_ptr(), len: buf.len() }).map(|r| r as usize)
}

/// `write(2)`. No partial-write loop: short writes are returned verbatim.
pub fn write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    dispatch(ActionKind::Write { fd, buf: buf.as_ptr(), len: buf.len() }).map(|r| r as usize)
}

/// `close(2)`.
pub fn close(fd: RawFd) -> io::Result<()> {
    dispatch(ActionKind::Close { fd }).map(|_| ())
}

/// `stat(2)`.
pub fn stat(path: &Path) -> io::Result<libc::stat> {
    let path = cstring(path)?;
    let mut out: libc::stat = unsafe { std::mem::zeroed() };
    dispatch(ActionKind::Stat { path, out: &mut out as *mut _ })?;
    Ok(out)
}

/// `fstat(2)`.
pub fn fstat(fd: RawFd) -> io::Result<libc::stat> {
    let mut out: libc::stat = unsafe { std::mem::zeroed() };
    dispatch(ActionKind::Fstat { fd, out: &mut out as *mut _ })?;
    Ok(out)
}

/// `lseek(2)`.
pub fn lseek(fd: RawFd, offset: i64, whence: i32) -> io::Result<i64> {
    dispatch(ActionKind::Lseek { fd, offset, whence })
}

/// `unlink(2)`.
pub fn unlink(path: &Path) -> io::Result<()> {
    let path = cstring(path)?;
    dispatch(ActionKind::Unlink { path }).map(|_| ())
}

/// `mkdir(2)`.
pub fn mkdir(path: &Path, mode: u32) -> io::Result<()> {
    let path = cstring(path)?;
    dispatch(ActionKind::Mkdir { path, mode }).map(|_| ())
}

/// `rmdir(2)`.
pub fn rmdir(path: &Path) -> io::Result<()> {
    let path = cstring(path)?;
    dispatch(ActionKind::Rmdir { path }).map(|_| ())
}

/// `rename(2)`.
pub fn rename(from: &Path, to: &Path) -> io::Result<()> {
    let from = cstring(from)?;
    let to = cstring(to)?;
    dispatch(ActionKind::Rename { from, to }).map(|_| ())
}

/// `connect(2)`.
pub fn connect(fd: RawFd, addr: libc::sockaddr_storage, addrlen: libc::socklen_t) -> io::Result<()> {
    dispatch(ActionKind::Connect { fd, addr, addrlen }).map(|_| ())
}

/// `accept(2)`. The peer address is not returned — callers needing it
/// should `getpeername` afterward; no `accept4`-style out-param variant
/// is exposed.
pub fn accept(fd: RawFd) -> io::Result<RawFd> {
    dispatch(ActionKind::Accept { fd }).map(|r| r as RawFd)
}

/// `send(2)`.
pub fn send(fd: RawFd, buf: &[u8], flags: i32) -> io::Result<usize> {
    dispatch(ActionKind::Send { fd, buf: buf.as_ptr(), len: buf.len(), flags }).map(|r| r as usize)
}

/// `recv(2)`.
pub fn recv(fd: RawFd, buf: &mut [u8], flags: i32) -> io::Result<usize> {
    dispatch(ActionKind::Recv { fd, buf: buf.as_mut_ptr(), len: buf.len(), flags }).map(|r| r as usize)
}

/// `pread(2)`.
pub fn pread(fd: RawFd, buf: &mut [u8], offset: i64) -> io::Result<usize> {
    dispatch(ActionKind::PRead { fd, buf: buf.as_mut_ptr(), len: buf.len(), offset }).map(|r| r as usize)
}

/// `pwrite(2)`.
pub fn pwrite(fd: RawFd, buf: &[u8], offset: i64) -> io::Result<usize> {
    dispatch(ActionKind::PWrite { fd, buf: buf.as_ptr(), len: buf.len(), offset }).map(|r| r as usize)
}

/// `ioctl(2)`, single-argument form (request + one `usize`-sized arg,
/// typically a pointer). Returns the dispatcher's actual result rather
/// than discarding it — see DESIGN.md for why that's treated as a bug
/// fix, not a behavior change.
pub fn ioctl(fd: RawFd, request: libc::c_ulong, arg: usize) -> io::Result<i64> {
    dispatch(ActionKind::Ioctl { fd, request, arg })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Off the wire thread (plain `#[test]` threads never set the TLS
    /// flag), shims must take the direct-execution path — no offload
    /// context required, no queue, no response fiber.
    #[test]
    fn direct_path_requires_no_running_context() {
        assert!(!wire_runtime::is_wire_thread());

        let mut path = std::env::temp_dir();
        path.push(format!("wire-offload-shim-direct-{}", std::process::id()));
        std::fs::write(&path, b"direct").unwrap();

        let fd = open(&path, libc::O_RDONLY, 0).expect("open");
        let mut buf = [0u8; 6];
        let n = read(fd, &mut buf).expect("read");
        close(fd).expect("close");

        assert_eq!(n, 6);
        assert_eq!(&buf, b"direct");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn direct_path_propagates_errno() {
        let err = open(Path::new("/nonexistent/wire-offload-shim-test"), libc::O_RDONLY, 0)
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    /// `FIONREAD` on a pipe with known bytes buffered exercises the full
    /// round trip through `dispatch`/`ActionKind::Ioctl`/`worker::execute`.
    /// A dispatcher that dropped its return value instead of forwarding it
    /// (the teacher's own bug, see DESIGN.md) would still leak the byte
    /// count through the `FIONREAD` out-param, so this also asserts on the
    /// `Ok` variant itself: a version that returned `Ok(-1)` or swallowed
    /// the syscall's real (successful) return would fail this.
    #[test]
    fn ioctl_fionread_returns_dispatcher_result() {
        let mut fds: [libc::c_int; 2] = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0, "pipe() should succeed");
        let (read_fd, write_fd) = (fds[0], fds[1]);

        let data = b"wire";
        let written = unsafe {
            libc::write(write_fd, data.as_ptr() as *const libc::c_void, data.len())
        };
        assert_eq!(written, data.len() as isize);

        let mut available: libc::c_int = -1;
        let ret = ioctl(read_fd, libc::FIONREAD, &mut available as *mut libc::c_int as usize)
            .expect("ioctl(FIONREAD) should succeed");
        assert_eq!(ret, 0, "ioctl(2) itself returns 0 on success for FIONREAD");
        assert_eq!(available, data.len() as libc::c_int);

        let err = ioctl(-1, libc::FIONREAD, &mut available as *mut libc::c_int as usize)
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));

        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
    }
}
