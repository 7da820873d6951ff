//! x86_64 context switching.
//!
//! Voluntary-only: this scheduler never preempts a fiber, so there is no
//! forced-restore path and no need to save anything beyond the callee-saved
//! registers the System V AMD64 ABI already guarantees a function must
//! preserve across a call.

use std::arch::naked_asm;

/// Callee-saved register file for one fiber (or the scheduler's own
/// context, which uses a `SavedRegs` the same way).
#[repr(C)]
#[derive(Default)]
pub struct SavedRegs {
    pub rsp: u64,
    pub rip: u64,
    pub rbx: u64,
    pub rbp: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
}

/// Lay out a fresh fiber's register file so the first switch into it lands
/// in [`entry_trampoline`], which calls `entry_fn(entry_arg)`.
///
/// # Safety
///
/// `stack_top` must be a valid, writable stack top (it is decremented and
/// aligned here, not dereferenced).
#[inline]
pub unsafe fn init_context(regs: &mut SavedRegs, stack_top: *mut u8, entry_fn: usize, entry_arg: usize) {
    let sp = stack_top as usize;
    // `context_switch_voluntary` reaches the trampoline via `jmp`, not
    // `call`, so rsp must already sit on a 16-byte boundary here: the
    // trampoline's own `call r12` then pushes the one return address the
    // ABI expects before `entry_fn` starts running.
    let aligned_sp = sp & !0xF;

    regs.rsp = aligned_sp as u64;
    regs.rip = entry_trampoline as usize as u64;
    regs.rbx = 0;
    regs.rbp = 0;
    regs.r12 = entry_fn as u64;
    regs.r13 = entry_arg as u64;
    regs.r14 = 0;
    regs.r15 = 0;
}

/// First code a freshly spawned fiber runs: calls `entry_fn(entry_arg)`
/// (stashed in r12/r13 by [`init_context`]), then hands off to
/// `scheduler::finish_current` and never returns.
#[unsafe(naked)]
unsafe extern "C" fn entry_trampoline() {
    naked_asm!(
        "mov rdi, r13",
        "call r12",
        "call {finish}",
        "ud2",
        finish = sym finish_trampoline,
    );
}

extern "C" fn finish_trampoline() {
    crate::scheduler::finish_current();
    unreachable!("finish_current switched away and should never return");
}

/// Save the caller's callee-saved registers into `old`, load `new`'s, and
/// jump to `new.rip`. Used symmetrically in both directions: scheduler to
/// fiber, and fiber back to scheduler.
///
/// # Safety
///
/// Both pointers must be valid, non-overlapping `SavedRegs`. `new` must
/// have been produced either by a prior call into this function (so its
/// `rip` is a valid resume point) or by [`init_context`].
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch_voluntary(_old: *mut SavedRegs, _new: *const SavedRegs) {
    naked_asm!(
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 1f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "jmp rax",
        "1:",
        "ret",
    );
}
