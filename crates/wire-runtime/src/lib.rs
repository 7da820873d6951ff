//! # wire-runtime
//!
//! A minimal single-OS-thread cooperative fiber scheduler: stackful
//! coroutines, a ready queue, and an epoll-backed fd-readiness primitive.
//! This is deliberately small — it exists to give the blocking-I/O offload
//! bridge (`wire-offload`) a real collaborator to resume and suspend,
//! not to be a general-purpose async runtime. No work-stealing, no forced
//! preemption, no multi-threaded fiber execution.

#![allow(dead_code)]

mod arch;
mod fd;
mod scheduler;
mod stack;
pub mod tls;

pub use scheduler::{block_on, fd_detach, fd_wait_read, resume, spawn, suspend, yield_now};
pub use tls::{current_fiber, is_wire_thread};
pub use wire_core::FiberId;
