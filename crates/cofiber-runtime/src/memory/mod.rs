//! Shared stack region
//!
//! One mapping is shared by every fiber: whichever fiber is Running owns
//! `[bottom, top)`, and suspended fibers keep their live span in a
//! `StackSnapshot` until they are resumed. A no-access guard page sits just
//! below `bottom`.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::page_size;
    } else {
        compile_error!("cofiber requires a unix target for its stack mapping");
    }
}

use cofiber_core::error::{SchedError, SchedResult};

/// The stack region every fiber runs on
pub struct SharedStack {
    /// Start of the mapping (guard page included)
    base: *mut u8,

    /// Mapping length in bytes
    total: usize,

    /// Usable stack bytes above the guard
    size: usize,

    /// Guard length in bytes
    guard: usize,
}

/// Round `n` up to a multiple of `align` (a power of two)
#[inline]
pub(crate) const fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

impl SharedStack {
    /// Usable size (also the per-fiber stack budget)
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of the guard region below the stack
    #[inline]
    pub fn guard_size(&self) -> usize {
        self.guard
    }

    /// Lowest usable address
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        // SAFETY: the guard lies inside the mapping
        unsafe { self.base.add(self.guard) }
    }

    /// One past the highest usable address; stacks grow down from here
    #[inline]
    pub fn top(&self) -> *mut u8 {
        // SAFETY: guard + size == total
        unsafe { self.base.add(self.total) }
    }

    /// Bytes between `sp` and the top, i.e. the live span of a fiber that
    /// was suspended with stack pointer `sp`
    pub fn span_from(&self, sp: usize) -> SchedResult<usize> {
        let top = self.top() as usize;
        let bottom = self.bottom() as usize;
        if sp > top {
            return Err(SchedError::StackBudgetExceeded { used: 0, budget: self.size });
        }
        let used = top - sp;
        if sp < bottom {
            return Err(SchedError::StackBudgetExceeded { used, budget: self.size });
        }
        Ok(used)
    }

    /// View of the usable region
    ///
    /// # Safety
    ///
    /// No fiber may be running on the region while the slice is alive.
    #[inline]
    pub unsafe fn as_slice(&self) -> &[u8] {
        std::slice::from_raw_parts(self.bottom(), self.size)
    }

    /// Mutable view of the usable region
    ///
    /// # Safety
    ///
    /// Same as `as_slice`, and the bytes being overwritten must not belong
    /// to a flow that can still run without a copy-in.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut_slice(&self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.bottom(), self.size)
    }
}

impl std::fmt::Debug for SharedStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStack")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .field("size", &self.size)
            .field("guard", &self.guard)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0, 4096), 0);
        assert_eq!(round_up(1, 4096), 4096);
        assert_eq!(round_up(4096, 4096), 4096);
        assert_eq!(round_up(20_000, 16384), 32768);
    }

    #[test]
    fn test_map_and_bounds() {
        let stack = SharedStack::new(64 * 1024).unwrap();
        let page = page_size();

        assert_eq!(stack.size(), round_up(64 * 1024, page));
        assert_eq!(stack.guard_size(), page);
        assert_eq!(stack.top() as usize - stack.bottom() as usize, stack.size());
        assert_eq!(stack.top() as usize % page, 0);
    }

    #[test]
    fn test_size_rounded_to_page() {
        let stack = SharedStack::new(20_000).unwrap();
        assert_eq!(stack.size() % page_size(), 0);
        assert!(stack.size() >= 20_000);
    }

    #[test]
    fn test_span_from() {
        let stack = SharedStack::new(64 * 1024).unwrap();
        let top = stack.top() as usize;

        assert_eq!(stack.span_from(top).unwrap(), 0);
        assert_eq!(stack.span_from(top - 256).unwrap(), 256);
        assert_eq!(stack.span_from(stack.bottom() as usize).unwrap(), stack.size());
        assert!(matches!(
            stack.span_from(stack.bottom() as usize - 8),
            Err(SchedError::StackBudgetExceeded { .. })
        ));
        assert!(stack.span_from(top + 8).is_err());
    }

    #[test]
    fn test_region_is_writable() {
        let stack = SharedStack::new(64 * 1024).unwrap();
        unsafe {
            let region = stack.as_mut_slice();
            region[0] = 0xAB;
            let last = region.len() - 1;
            region[last] = 0xCD;
            assert_eq!(stack.as_slice()[0], 0xAB);
            assert_eq!(stack.as_slice()[last], 0xCD);
        }
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(SharedStack::new(0).is_err());
    }
}
