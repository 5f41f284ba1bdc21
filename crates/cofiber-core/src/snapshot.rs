//! Per-fiber stack snapshots
//!
//! All fibers execute on one shared stack region. When a fiber is suspended
//! the live part of that region (from its stack pointer up to the region's
//! top, since stacks grow downward) is copied into the fiber's own snapshot,
//! and copied back to the same high-aligned offset before it resumes.
//!
//! The operations here work on plain byte slices whose last byte sits just
//! below the region's top. Raw pointer handling lives in the runtime's
//! memory module.

use crate::error::{SchedError, SchedResult};

/// Copied-out stack image of one suspended fiber
#[derive(Debug, Default)]
pub struct StackSnapshot {
    /// Backing buffer; its length is the snapshot capacity
    buf: Vec<u8>,

    /// Bytes of stack captured by the last copy-out
    used: usize,
}

impl StackSnapshot {
    /// Create an empty snapshot (fiber never yielded)
    pub const fn new() -> Self {
        Self { buf: Vec::new(), used: 0 }
    }

    /// Bytes captured by the last copy-out
    #[inline]
    pub fn used_size(&self) -> usize {
        self.used
    }

    /// Allocated size; grows monotonically, never shrinks
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Capture the top `used` bytes of `stack`
    ///
    /// `stack.len()` is the budget. The buffer grows to exactly `used` when it
    /// is too small.
    pub fn copy_out(&mut self, stack: &[u8], used: usize) -> SchedResult<()> {
        let budget = stack.len();
        if used > budget {
            return Err(SchedError::StackBudgetExceeded { used, budget });
        }

        if used > self.buf.len() {
            self.buf.reserve_exact(used - self.buf.len());
            self.buf.resize(used, 0);
        }

        self.buf[..used].copy_from_slice(&stack[budget - used..]);
        self.used = used;
        Ok(())
    }

    /// Restore the captured bytes to `top - used .. top` of `stack`
    pub fn copy_in(&self, stack: &mut [u8]) -> SchedResult<()> {
        let budget = stack.len();
        if self.used > budget {
            return Err(SchedError::StackBudgetExceeded { used: self.used, budget });
        }

        stack[budget - self.used..].copy_from_slice(&self.buf[..self.used]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    /// Bytes the snapshot would write back into a region of `len` bytes
    fn restored(snap: &StackSnapshot, len: usize) -> Vec<u8> {
        let mut region = vec![0u8; len];
        snap.copy_in(&mut region).unwrap();
        region[len - snap.used_size()..].to_vec()
    }

    #[test]
    fn test_new_is_empty() {
        let snap = StackSnapshot::new();
        assert_eq!(snap.used_size(), 0);
        assert_eq!(snap.capacity(), 0);
        assert!(restored(&snap, 64).is_empty());
    }

    #[test]
    fn test_copy_out_takes_top_of_region() {
        let stack = patterned(4096);
        let mut snap = StackSnapshot::new();

        snap.copy_out(&stack, 100).unwrap();

        assert_eq!(snap.used_size(), 100);
        assert_eq!(snap.capacity(), 100);
        assert_eq!(restored(&snap, 4096), &stack[4096 - 100..]);
    }

    #[test]
    fn test_copy_in_restores_after_clobber() {
        let original = patterned(2048);
        let mut stack = original.clone();
        let mut snap = StackSnapshot::new();

        snap.copy_out(&stack, 700).unwrap();

        // Another fiber runs and scribbles over the shared region
        for b in stack.iter_mut() {
            *b = 0xAA;
        }

        snap.copy_in(&mut stack).unwrap();
        assert_eq!(&stack[2048 - 700..], &original[2048 - 700..]);
        // Below the span is untouched by copy-in
        assert!(stack[..2048 - 700].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_capacity_grows_monotonically() {
        let stack = patterned(8192);
        let mut snap = StackSnapshot::new();

        snap.copy_out(&stack, 3000).unwrap();
        assert_eq!(snap.capacity(), 3000);

        snap.copy_out(&stack, 500).unwrap();
        assert_eq!(snap.used_size(), 500);
        assert_eq!(snap.capacity(), 3000);
        assert_eq!(restored(&snap, 8192), &stack[8192 - 500..]);

        snap.copy_out(&stack, 5000).unwrap();
        assert_eq!(snap.capacity(), 5000);
    }

    #[test]
    fn test_budget_exceeded() {
        let stack = patterned(1024);
        let mut snap = StackSnapshot::new();

        let err = snap.copy_out(&stack, 1025).unwrap_err();
        assert_eq!(err, SchedError::StackBudgetExceeded { used: 1025, budget: 1024 });
        assert_eq!(snap.used_size(), 0);

        // A snapshot taken against a larger region cannot go into a smaller one
        let big = patterned(4096);
        snap.copy_out(&big, 2000).unwrap();
        let mut small = vec![0u8; 1024];
        assert!(matches!(
            snap.copy_in(&mut small),
            Err(SchedError::StackBudgetExceeded { used: 2000, budget: 1024 })
        ));
    }
}
