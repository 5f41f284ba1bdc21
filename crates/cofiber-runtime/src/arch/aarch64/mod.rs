//! aarch64 context switching (AAPCS64)

use crate::context::{EntryFn, HardwareContext};
use cofiber_core::constants::STACK_ALIGN;
use std::arch::naked_asm;

/// Saved callee-saved registers
///
/// Layout is fixed for the assembly below: sp, return address (x30),
/// frame pointer (x29), x19-x28, then d8-d15.
#[repr(C)]
#[derive(Debug, Default)]
pub struct Context {
    pub sp: u64,
    pub lr: u64,
    pub fp: u64,
    pub x19: u64,
    pub x20: u64,
    pub x21: u64,
    pub x22: u64,
    pub x23: u64,
    pub x24: u64,
    pub x25: u64,
    pub x26: u64,
    pub x27: u64,
    pub x28: u64,
    pub d8: u64,
    pub d9: u64,
    pub d10: u64,
    pub d11: u64,
    pub d12: u64,
    pub d13: u64,
    pub d14: u64,
    pub d15: u64,
}

unsafe impl HardwareContext for Context {
    unsafe fn prepare(&mut self, stack_top: *mut u8, entry: EntryFn, arg: usize) {
        let sp = (stack_top as usize) & !(STACK_ALIGN - 1);

        // `ret` in context_switch jumps to lr, so a fresh context starts in
        // the trampoline with entry in x19 and arg in x20.
        *self = Context {
            sp: sp as u64,
            lr: entry_trampoline as *const () as usize as u64,
            x19: entry as *const () as usize as u64,
            x20: arg as u64,
            ..Context::default()
        };
    }

    #[inline]
    unsafe fn switch(from: *mut Self, to: *const Self) {
        context_switch(from, to);
    }

    #[inline]
    fn stack_pointer(&self) -> usize {
        self.sp as usize
    }
}

#[unsafe(naked)]
unsafe extern "C" fn entry_trampoline() {
    naked_asm!(
        "mov x0, x20",
        "blr x19",
        "brk #0x1",
    );
}

/// Save callee-saved registers to `old` (x0) and load them from `new` (x1)
#[unsafe(naked)]
unsafe extern "C" fn context_switch(_old: *mut Context, _new: *const Context) {
    naked_asm!(
        "mov x9, sp",
        "str x9,  [x0, #0x00]",
        "str x30, [x0, #0x08]",
        "str x29, [x0, #0x10]",
        "stp x19, x20, [x0, #0x18]",
        "stp x21, x22, [x0, #0x28]",
        "stp x23, x24, [x0, #0x38]",
        "stp x25, x26, [x0, #0x48]",
        "stp x27, x28, [x0, #0x58]",
        "stp d8,  d9,  [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",

        "ldr x9,  [x1, #0x00]",
        "mov sp, x9",
        "ldr x30, [x1, #0x08]",
        "ldr x29, [x1, #0x10]",
        "ldp x19, x20, [x1, #0x18]",
        "ldp x21, x22, [x1, #0x28]",
        "ldp x23, x24, [x1, #0x38]",
        "ldp x25, x26, [x1, #0x48]",
        "ldp x27, x28, [x1, #0x58]",
        "ldp d8,  d9,  [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
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
        assert_eq!(std::mem::size_of::<Context>(), 0xa8);
    }

    #[test]
    fn test_prepare_aligns_and_records_entry() {
        let mut ctx = Context::default();
        unsafe { ctx.prepare(0x2000_0fffusize as *mut u8, never, 7) };

        assert_eq!(ctx.stack_pointer(), 0x2000_0ff0);
        assert_eq!(ctx.lr, entry_trampoline as *const () as usize as u64);
        assert_eq!(ctx.x19, never as *const () as usize as u64);
        assert_eq!(ctx.x20, 7);
    }
}
