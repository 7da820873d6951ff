//! End-to-end scenarios exercising the offload bridge against the real
//! filesystem and pipes.
//!
//! `wire_offload::init` is a process-wide singleton — teardown is not a
//! supported first-class operation — so every scenario below runs inside a
//! single `#[test]` function, sharing one offload context and driving
//! several `wire_runtime::block_on` calls back to back on the same OS
//! thread. Splitting these into separate `#[test]` fns would race each
//! other for the one-shot `init()` call.

use std::cell::Cell;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const N_WORKERS: usize = 4;

fn unique_path(label: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("wire-offload-test-{}-{}-{}", std::process::id(), label, n))
}

#[test]
fn end_to_end_scenarios() {
    wire_offload::init(N_WORKERS).expect("init should succeed exactly once");

    single_read();
    concurrent_opens();
    idle_busy_idle_stat();
    interleaved_pipe_bursts();
    nonexistent_open_propagates_enoent();
    variadic_open_create_mode();
}

/// Scenario 1: one fiber reads a known-contents file in one call.
fn single_read() {
    let path = unique_path("single-read");
    std::fs::write(&path, b"ABCDEFGHIJ").unwrap();

    let result = Rc::new(Cell::new(None));
    let result2 = result.clone();
    let path2 = path.clone();

    wire_runtime::block_on(move || {
        let fd = wire_offload::open(&path2, libc::O_RDONLY, 0).expect("open");
        let mut buf = [0u8; 10];
        let n = wire_offload::read(fd, &mut buf).expect("read");
        wire_offload::close(fd).expect("close");
        result2.set(Some((n, buf)));
    });

    let (n, buf) = result.take().expect("fiber ran to completion");
    assert_eq!(n, 10);
    assert_eq!(&buf, b"ABCDEFGHIJ");
    assert_eq!(wire_offload::active_io_count(), 0);

    let _ = std::fs::remove_file(&path);
}

/// Scenario 2: 100 fibers each open /dev/null concurrently; all succeed,
/// and the active-io counter returns to zero.
fn concurrent_opens() {
    let successes = Arc::new(AtomicUsize::new(0));
    let successes_outer = successes.clone();

    wire_runtime::block_on(move || {
        for _ in 0..100 {
            let successes = successes.clone();
            let fiber = wire_runtime::spawn(move || {
                let fd = wire_offload::open(Path::new("/dev/null"), libc::O_RDONLY, 0);
                if let Ok(fd) = fd {
                    successes.fetch_add(1, Ordering::Relaxed);
                    let _ = wire_offload::close(fd);
                }
            });
            wire_runtime::resume(fiber);
        }

        assert_eq!(successes.load(Ordering::Relaxed), 0, "fibers haven't run yet");
    });

    assert_eq!(successes_outer.load(Ordering::Relaxed), 100, "all 100 opens should have succeeded");
    assert_eq!(wire_offload::active_io_count(), 0);
}

/// Scenario 3: idle -> busy -> idle. One stat call after the response
/// fiber has had a chance to reach `FullySuspended`; it must still be
/// woken and deliver the correct result.
fn idle_busy_idle_stat() {
    let path = unique_path("idle-busy-idle");
    std::fs::write(&path, b"hello").unwrap();
    let path2 = path.clone();

    let mode_ok = Rc::new(Cell::new(false));
    let mode_ok2 = mode_ok.clone();

    // First block_on with no I/O at all lets the response fiber settle
    // into FullySuspended before the second block_on submits anything.
    wire_runtime::block_on(|| {});
    assert_eq!(wire_offload::active_io_count(), 0);

    wire_runtime::block_on(move || {
        let st = wire_offload::stat(&path2).expect("stat");
        mode_ok2.set(st.st_size == 5);
    });

    assert!(mode_ok.get());
    assert_eq!(wire_offload::active_io_count(), 0);

    let _ = std::fs::remove_file(&path);
}

/// Scenario 4: one fiber writes 1000 single bytes into a pipe while
/// another reads them back, interleaved. No deadlock, all data arrives in
/// order, final counter is zero.
fn interleaved_pipe_bursts() {
    use nix::unistd::pipe;
    use std::os::unix::io::{IntoRawFd, RawFd};

    let (read_fd, write_fd) = pipe().expect("pipe");
    let read_fd: RawFd = read_fd.into_raw_fd();
    let write_fd: RawFd = write_fd.into_raw_fd();

    let received = Rc::new(std::cell::RefCell::new(Vec::with_capacity(1000)));
    let received2 = received.clone();

    wire_runtime::block_on(move || {
        let writer = wire_runtime::spawn(move || {
            for i in 0..1000u32 {
                let byte = [(i % 256) as u8];
                wire_offload::write(write_fd, &byte).expect("write");
            }
            wire_offload::close(write_fd).expect("close write end");
        });
        let reader = wire_runtime::spawn(move || {
            for _ in 0..1000u32 {
                let mut byte = [0u8];
                let n = wire_offload::read(read_fd, &mut byte).expect("read");
                assert_eq!(n, 1);
                received2.borrow_mut().push(byte[0]);
            }
            wire_offload::close(read_fd).expect("close read end");
        });
        wire_runtime::resume(writer);
        wire_runtime::resume(reader);
    });

    let got = received.borrow();
    assert_eq!(got.len(), 1000);
    for (i, &b) in got.iter().enumerate() {
        assert_eq!(b, (i % 256) as u8);
    }
    assert_eq!(wire_offload::active_io_count(), 0);
}

/// Scenario 5: open a nonexistent path; error propagates bit-identical to
/// a direct call (ENOENT).
fn nonexistent_open_propagates_enoent() {
    let result = Rc::new(Cell::new(None));
    let result2 = result.clone();

    wire_runtime::block_on(move || {
        let err = wire_offload::open(Path::new("/nonexistent/path/for/wire-offload-tests"), libc::O_RDONLY, 0)
            .unwrap_err();
        result2.set(err.raw_os_error());
    });

    assert_eq!(result.take(), Some(libc::ENOENT));
}

/// Scenario 6: the variadic `open(..., O_CREAT, mode)` shim correctly
/// extracts and applies `mode`.
fn variadic_open_create_mode() {
    let path = unique_path("variadic-create");
    let path2 = path.clone();

    wire_runtime::block_on(move || {
        let fd = wire_offload::open(&path2, libc::O_CREAT | libc::O_WRONLY, 0o644).expect("create");
        wire_offload::write(fd, b"x").expect("write");
        wire_offload::close(fd).expect("close");
    });

    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
}
