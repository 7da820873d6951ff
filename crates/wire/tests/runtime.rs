//! Exercises the public facade end to end: `Runtime::new` + `block_on` +
//! `offload::*`, without reaching into `wire-runtime`/`wire-offload`
//! directly. Deeper scenario coverage (concurrent submissions, pipe
//! bursts, error propagation, ...) lives in `wire-offload`'s own
//! integration tests — this crate only needs to prove the facade wires
//! things up correctly.

use std::cell::Cell;
use std::rc::Rc;

// `Runtime::new` builds a process-wide singleton (`wire_offload::init` is
// rejected on a second call — see `OffloadError::AlreadyInitialized`), and
// by default `cargo test` runs every `#[test]` fn concurrently on its own
// OS thread. Two separate test functions each calling `Runtime::new` would
// race over which one gets the real context and which gets rejected, so
// both halves of this property live in one test to keep the ordering
// deterministic.
#[test]
fn runtime_lifecycle() {
    let mut path = std::env::temp_dir();
    path.push(format!("wire-facade-test-{}", std::process::id()));
    std::fs::write(&path, b"hello-wire").unwrap();

    let rt = wire::Runtime::new(2).expect("runtime init");

    let result = Rc::new(Cell::new(None));
    let result2 = result.clone();
    let path2 = path.clone();

    rt.block_on(move || {
        let fd = wire::offload::open(&path2, libc::O_RDONLY, 0).expect("open");
        let mut buf = [0u8; 10];
        let n = wire::offload::read(fd, &mut buf).expect("read");
        wire::offload::close(fd).expect("close");
        result2.set(Some((n, buf)));
    });

    let (n, buf) = result.take().expect("root fiber ran");
    assert_eq!(n, 10);
    assert_eq!(&buf, b"hello-wire");
    assert_eq!(wire::offload::active_io_count(), 0);

    let _ = std::fs::remove_file(&path);

    // A second `Runtime::new` in the same process must not silently
    // replace the first context — there is no first-class re-init.
    match wire::Runtime::new(1) {
        Err(wire::OffloadError::AlreadyInitialized) => {}
        Ok(_) => panic!("second Runtime::new in the same process should be rejected"),
        Err(e) => panic!("unexpected error: {e}"),
    }
}
