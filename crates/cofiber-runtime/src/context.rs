//! Hardware execution context abstraction
//!
//! The scheduler never touches registers itself. It asks a
//! `HardwareContext` to build an initial context for a fiber, to switch
//! between two contexts, and to report the stack pointer saved by the last
//! switch away from a context. That last value is the exact lower bound of
//! the stack span a suspended fiber needs preserved.
//!
//! `NativeContext` is the implementation for the build target. Tests and
//! embedders may substitute their own (for example a wrapper that counts
//! switches) through `Scheduler<C>`.

/// Entry point called on a fresh context. Must never return.
pub type EntryFn = extern "C" fn(usize) -> !;

/// Capture/restore of one execution context
///
/// # Safety
///
/// Implementors must save every callee-saved register of the platform ABI
/// in `switch`, record the stack pointer of the suspended side so that
/// nothing it still needs lies below it, and must not write to the stack
/// memory given to `prepare` (it may currently belong to another fiber).
pub unsafe trait HardwareContext: Default + 'static {
    /// Build a context that, when first switched to, calls `entry(arg)` with
    /// a stack pointer at or just below `stack_top`.
    ///
    /// # Safety
    ///
    /// `stack_top` must be the top of a writable region large enough for the
    /// entry function and everything it calls.
    unsafe fn prepare(&mut self, stack_top: *mut u8, entry: EntryFn, arg: usize);

    /// Save the current context into `from` and activate `to`
    ///
    /// Returns when some later switch activates `from` again.
    ///
    /// # Safety
    ///
    /// `to` must have been prepared or saved by an earlier switch, and its
    /// stack contents must be in place.
    unsafe fn switch(from: *mut Self, to: *const Self);

    /// Stack pointer recorded when this context was last switched away from
    fn stack_pointer(&self) -> usize;
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        /// Context type for the build target
        pub type NativeContext = crate::arch::x86_64::Context;
    } else if #[cfg(target_arch = "aarch64")] {
        /// Context type for the build target
        pub type NativeContext = crate::arch::aarch64::Context;
    }
}
