//! Minimal kernel-style logging.
//!
//! No external logging crate: a level filter read once from
//! `WIRE_LOG_LEVEL` (0=off .. 5=trace), plain `eprintln!` output, optional
//! forced flush via `WIRE_FLUSH_LOG=1` for debugging crashes. Scaled down
//! to what a single-threaded wire runtime plus a worker pool needs: every
//! line is tagged with the emitting thread's role.
//!
//! # Usage
//!
//! ```ignore
//! use wire_core::{wdebug, winfo, wwarn, werror};
//! winfo!("offload: {} workers started", n);
//! ```

use crate::env::{env_get, env_get_bool};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

static LEVEL: OnceLock<AtomicU8> = OnceLock::new();
static FLUSH: OnceLock<AtomicBool> = OnceLock::new();

fn level() -> &'static AtomicU8 {
    LEVEL.get_or_init(|| AtomicU8::new(env_get::<u8>("WIRE_LOG_LEVEL", LogLevel::Warn as u8)))
}

fn flush_enabled() -> &'static AtomicBool {
    FLUSH.get_or_init(|| AtomicBool::new(env_get_bool("WIRE_FLUSH_LOG", false)))
}

/// Override the log level at runtime (tests, embedders).
pub fn set_log_level(l: LogLevel) {
    level().store(l as u8, Ordering::Relaxed);
}

#[inline]
pub fn enabled(l: LogLevel) -> bool {
    l as u8 <= level().load(Ordering::Relaxed)
}

/// Write one line, tagged with `role` (e.g. `"wire"`, `"worker[2]"`,
/// `"response-fiber"`). Not for direct use — call through the `w*!` macros.
pub fn emit(l: LogLevel, role: &str, args: std::fmt::Arguments<'_>) {
    if !enabled(l) {
        return;
    }
    let tag = LogLevel::from_u8(l as u8);
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "[{:?}] [{}] {}", tag, role, args);
    if flush_enabled().load(Ordering::Relaxed) {
        let _ = stderr.flush();
    }
}

/// Log at a given level, tagged with the calling role.
#[macro_export]
macro_rules! wlog {
    ($level:expr, $role:expr, $($arg:tt)*) => {
        $crate::wlog::emit($level, $role, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! werror {
    ($role:expr, $($arg:tt)*) => { $crate::wlog!($crate::wlog::LogLevel::Error, $role, $($arg)*) };
}

#[macro_export]
macro_rules! wwarn {
    ($role:expr, $($arg:tt)*) => { $crate::wlog!($crate::wlog::LogLevel::Warn, $role, $($arg)*) };
}

#[macro_export]
macro_rules! winfo {
    ($role:expr, $($arg:tt)*) => { $crate::wlog!($crate::wlog::LogLevel::Info, $role, $($arg)*) };
}

#[macro_export]
macro_rules! wdebug {
    ($role:expr, $($arg:tt)*) => { $crate::wlog!($crate::wlog::LogLevel::Debug, $role, $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter() {
        set_log_level(LogLevel::Warn);
        assert!(enabled(LogLevel::Error));
        assert!(enabled(LogLevel::Warn));
        assert!(!enabled(LogLevel::Info));
        set_log_level(LogLevel::Warn); // restore for other tests in this process
    }
}
