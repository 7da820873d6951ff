//! Fd readiness: one epoll instance per wire thread, used by the scheduler's
//! run loop to park when nothing is runnable but something is expected to
//! become readable (the response fiber's `FdParked` state).
//!
//! This is the concrete implementation of the collaborator contract
//! spec'd as `wire_fd_*`: register interest (`add_read`), drop interest
//! (`remove`), and block until something is ready (`wait`).

use std::os::unix::io::RawFd;
use wire_core::{SchedError, SchedResult};

pub struct FdReadiness {
    epoll_fd: RawFd,
}

impl FdReadiness {
    pub fn new() -> SchedResult<Self> {
        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd < 0 {
            return Err(SchedError::Platform(errno()));
        }
        Ok(Self { epoll_fd })
    }

    /// Register (or re-register) `fd` for read readiness, tagged with
    /// `token` (returned from [`FdReadiness::wait`] when it fires).
    pub fn add_read(&self, fd: RawFd, token: u64) -> SchedResult<()> {
        let mut ev = libc::epoll_event { events: libc::EPOLLIN as u32, u64: token };
        let ret = unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_ADD, fd, &mut ev) };
        if ret != 0 {
            let e = errno();
            if e == libc::EEXIST {
                let ret = unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_MOD, fd, &mut ev) };
                if ret != 0 {
                    return Err(SchedError::Platform(errno()));
                }
                return Ok(());
            }
            return Err(SchedError::Platform(e));
        }
        Ok(())
    }

    /// Drop interest in `fd` entirely (the `FullySuspended` transition).
    pub fn remove(&self, fd: RawFd) -> SchedResult<()> {
        let ret = unsafe {
            libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut())
        };
        if ret != 0 && errno() != libc::ENOENT {
            return Err(SchedError::Platform(errno()));
        }
        Ok(())
    }

    /// Block (up to `timeout_ms`, or indefinitely if negative) until at
    /// least one registered fd is ready; returns the tokens that fired.
    pub fn wait(&self, timeout_ms: i32) -> Vec<u64> {
        let mut events: [libc::epoll_event; 64] = unsafe { std::mem::zeroed() };
        let n = unsafe {
            libc::epoll_wait(self.epoll_fd, events.as_mut_ptr(), events.len() as i32, timeout_ms)
        };
        if n <= 0 {
            return Vec::new();
        }
        events[..n as usize].iter().map(|e| e.u64).collect()
    }
}

impl Drop for FdReadiness {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll_fd);
        }
    }
}

fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}
