//! # wire-offload
//!
//! The blocking-I/O offload bridge: lets a fiber running on the
//! single-threaded `wire` scheduler call the POSIX file and socket surface
//! — `open`, `read`, `stat`, `connect`, ... — as if it simply blocked,
//! while the call is actually marshalled to a worker OS thread and its
//! result returned through a response channel wired into the event loop.
//!
//! ## Modules
//!
//! - `action` — the action record: inputs, outputs, dispatch tag, wait
//!   handle.
//! - `queue` — the mutex+condvar submission queue fibers push onto and
//!   workers pop from.
//! - `worker` — the fixed worker thread pool and its dispatch function.
//! - `channel` — the response socket pair workers write completions to.
//! - `response` — the dedicated response fiber that drains the channel
//!   and resumes waiters.
//! - `submit` — the submission path called from arbitrary caller fibers.
//! - `shims` — the public per-syscall entry points.
//! - `context` — the process-wide singleton tying the above together,
//!   plus [`init`].
//! - `config` — [`OffloadConfig`], the runtime's one required knob
//!   (`n_workers`) plus tuning/diagnostics knobs.
//! - `error` — [`OffloadError`], the recoverable half of this crate's
//!   error taxonomy.

#![allow(dead_code)]

mod action;
mod channel;
mod config;
mod context;
mod error;
mod queue;
mod response;
mod shims;
mod submit;
mod worker;

pub use config::OffloadConfig;
pub use context::{active_io_count, init};
pub use error::{OffloadError, Result};
pub use shims::*;
