//! x86_64 context switching (System V AMD64 ABI)

use crate::context::{EntryFn, HardwareContext};
use cofiber_core::constants::STACK_ALIGN;
use std::arch::naked_asm;

/// Saved callee-saved registers
///
/// Layout is fixed for the assembly below:
/// ```text
/// 0x00: rsp   0x08: rip   0x10: rbx   0x18: rbp
/// 0x20: r12   0x28: r13   0x30: r14   0x38: r15
/// ```
#[repr(C)]
#[derive(Debug, Default)]
pub struct Context {
    pub rsp: u64,
    pub rip: u64,
    pub rbx: u64,
    pub rbp: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
}

unsafe impl HardwareContext for Context {
    unsafe fn prepare(&mut self, stack_top: *mut u8, entry: EntryFn, arg: usize) {
        // The trampoline is entered by `jmp`, so rsp must be 16-byte aligned
        // before its `call` pushes the return address.
        let sp = (stack_top as usize) & !(STACK_ALIGN - 1);

        *self = Context {
            rsp: sp as u64,
            rip: entry_trampoline as *const () as usize as u64,
            r12: entry as *const () as usize as u64,
            r13: arg as u64,
            ..Context::default()
        };
    }

    #[inline]
    unsafe fn switch(from: *mut Self, to: *const Self) {
        context_switch(from, to);
    }

    #[inline]
    fn stack_pointer(&self) -> usize {
        self.rsp as usize
    }
}

/// First code run by a fresh context: `entry(arg)` with entry in r12 and
/// arg in r13. `entry` never returns.
#[unsafe(naked)]
unsafe extern "C" fn entry_trampoline() {
    naked_asm!(
        "mov rdi, r13",
        "call r12",
        "ud2",
    );
}

/// Save callee-saved registers to `old` and load them from `new`
///
/// The saved rsp points at the return address pushed by the caller's
/// `call`, so `[rsp, top)` covers every byte the caller needs on resume.
#[unsafe(naked)]
unsafe extern "C" fn context_switch(_old: *mut Context, _new: *const Context) {
    naked_asm!(
        // Save to old (rdi)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        // Load from new (rsi)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "jmp rax",
        // Resume point of a saved context
        "2:",
        "ret",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never(_: usize) -> ! {
        unreachable!()
    }

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<Context>(), 64);
    }

    #[test]
    fn test_prepare_aligns_and_records_entry() {
        let mut ctx = Context::default();
        let top = 0x1000_0ff7usize as *mut u8;
        unsafe { ctx.prepare(top, never, 0xdead) };

        assert_eq!(ctx.rsp, 0x1000_0ff0);
        assert_eq!(ctx.stack_pointer(), 0x1000_0ff0);
        assert_eq!(ctx.rip, entry_trampoline as *const () as usize as u64);
        assert_eq!(ctx.r12, never as *const () as usize as u64);
        assert_eq!(ctx.r13, 0xdead);
        assert_eq!(ctx.rbp, 0);
    }
}
