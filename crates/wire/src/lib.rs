//! # wire
//!
//! A cooperative, single-threaded, stackful-coroutine ("fiber") runtime
//! for non-blocking I/O, with a bridge that lets fibers call the POSIX
//! file and socket surface without stalling the event loop.
//!
//! This crate is a thin facade: [`Runtime`] wires up the blocking-I/O
//! offload bridge (`wire_offload`, re-exported as [`offload`]) and the
//! fiber scheduler (`wire_runtime`), so application code has one `use`
//! line and one entry point instead of juggling three crates directly.
//!
//! ```no_run
//! fn main() {
//!     let rt = wire::Runtime::new(4).expect("offload init");
//!     rt.block_on(|| {
//!         let fd = wire::offload::open(
//!             std::path::Path::new("/etc/hostname"),
//!             libc::O_RDONLY,
//!             0,
//!         )
//!         .expect("open");
//!         let mut buf = [0u8; 256];
//!         let n = wire::offload::read(fd, &mut buf).expect("read");
//!         let _ = wire::offload::close(fd);
//!         println!("read {n} bytes");
//!     });
//! }
//! ```

#![allow(dead_code)]

pub use wire_core::{FiberId, SchedError, SchedResult};
pub use wire_offload as offload;
pub use wire_offload::{OffloadConfig, OffloadError};
pub use wire_runtime::{resume, spawn, suspend, yield_now};

/// Entry point: initializes the blocking-I/O offload bridge and runs a
/// root fiber — and everything it spawns — to quiescence.
pub struct Runtime {
    _private: (),
}

impl Runtime {
    /// Build a runtime with `n_workers` offload worker threads.
    ///
    /// Must be called on the OS thread that will subsequently call
    /// [`Runtime::block_on`]: [`wire_offload::init`] spawns the response
    /// fiber directly into that thread's scheduler state.
    ///
    /// Calling this a second time in the same process returns
    /// [`OffloadError::AlreadyInitialized`] — there is no supported way to
    /// reconfigure or tear down an offload context once built.
    pub fn new(n_workers: usize) -> Result<Self, OffloadError> {
        wire_offload::init(n_workers)?;
        Ok(Self { _private: () })
    }

    /// Run `root` as a fiber to completion, along with every fiber it
    /// (directly or transitively) spawns — including the offload bridge's
    /// response fiber — until the scheduler is fully idle.
    pub fn block_on<F>(self, root: F)
    where
        F: FnOnce() + 'static,
    {
        wire_runtime::block_on(root);
    }
}
