//! Per-fiber stack allocation: one guard-paged mmap region per fiber.
//!
//! Simpler than a shared slab of fixed slots — the offload core only ever
//! needs a handful of fibers live at once (one response fiber plus whatever
//! the application spawns), so the extra bookkeeping a shared region buys
//! isn't worth it here. The guard page is the part worth keeping: it turns
//! a stack overflow into a SIGSEGV at a fixed, recognizable address instead
//! of silent corruption of the next fiber's stack.

use wire_core::{SchedError, SchedResult};

/// An owned, guard-paged stack region.
///
/// Layout, low to high address: `[ guard page (PROT_NONE) | usable stack ]`.
/// The stack grows down from `top()` toward the guard page.
pub struct Stack {
    base: *mut u8,
    len: usize,
}

unsafe impl Send for Stack {}

impl Stack {
    /// Allocate a new stack of `size` usable bytes, rounded up to a page
    /// boundary, preceded by one guard page.
    pub fn new(size: usize) -> SchedResult<Self> {
        let page = page_size();
        let usable = round_up(size.max(page), page);
        let len = usable + page;

        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(SchedError::Platform(unsafe { *libc::__errno_location() }));
        }

        let usable_base = unsafe { (base as *mut u8).add(page) };
        let ret = unsafe {
            libc::mprotect(
                usable_base as *mut libc::c_void,
                usable,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if ret != 0 {
            let errno = unsafe { *libc::__errno_location() };
            unsafe { libc::munmap(base, len) };
            return Err(SchedError::Platform(errno));
        }

        Ok(Self { base: base as *mut u8, len })
    }

    /// Top of the usable stack (highest address, where the stack pointer
    /// starts — the stack grows down from here).
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.add(self.len) }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.len);
        }
    }
}

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}
