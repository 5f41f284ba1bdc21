//! Fiber identifier type

use core::fmt;

/// Identifier of a fiber
///
/// This is a 32-bit value that indexes into the scheduler's slot table.
/// The maximum value (u32::MAX) is reserved as the "idle" sentinel: no fiber
/// is running and the root flow of control owns the thread.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FiberId(u32);

impl FiberId {
    /// Sentinel value meaning "no fiber" (the root flow is active)
    pub const NONE: FiberId = FiberId(u32::MAX);

    /// Create a new FiberId from a raw value
    #[inline]
    pub const fn new(id: u32) -> Self {
        FiberId(id)
    }

    /// Create a FiberId from a slot index
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        FiberId(index as u32)
    }

    /// Get the raw u32 value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get as usize for indexing
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Check if this refers to a fiber slot
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    /// Convert to Option
    #[inline]
    pub const fn to_option(self) -> Option<FiberId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u32> for FiberId {
    #[inline]
    fn from(id: u32) -> Self {
        FiberId(id)
    }
}

impl From<FiberId> for u32 {
    #[inline]
    fn from(id: FiberId) -> Self {
        id.0
    }
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "FiberId(NONE)")
        } else {
            write!(f, "FiberId({})", self.0)
        }
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "idle")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for FiberId {
    fn default() -> Self {
        FiberId::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiber_id_basics() {
        let id = FiberId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(id.as_usize(), 7);
        assert!(!id.is_none());
        assert!(id.is_some());
        assert_eq!(FiberId::from_index(7), id);
    }

    #[test]
    fn test_fiber_id_none() {
        let none = FiberId::NONE;
        assert!(none.is_none());
        assert!(!none.is_some());
        assert_eq!(none.to_option(), None);
        assert_eq!(FiberId::default(), FiberId::NONE);
        assert_eq!(format!("{}", none), "idle");
    }

    #[test]
    fn test_fiber_id_conversions() {
        let id: FiberId = 3u32.into();
        let raw: u32 = id.into();
        assert_eq!(raw, 3);
        assert_eq!(format!("{:?}", id), "FiberId(3)");
    }
}
