//! Error types for the fiber scheduler

use core::fmt;
use crate::id::FiberId;

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur in scheduler operations
///
/// Most of these are contract violations. Recoverable entry points
/// (`try_spawn`, `join`, `Scheduler::new`) return them; the fatal paths
/// panic with their `Display` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// Every slot of the fiber table is occupied
    CapacityExceeded { capacity: usize },

    /// A fiber's in-use stack span exceeds the shared stack
    StackBudgetExceeded { used: usize, budget: usize },

    /// Handle or id does not refer to a live fiber of this scheduler
    InvalidHandle(FiberId),

    /// A completion signal was fired twice
    DoubleCompletion(FiberId),

    /// Operation requires a running fiber
    NotInFiber,

    /// A scheduler is already installed on this thread
    AlreadyInitialized,

    /// No scheduler is installed on this thread
    NotInitialized,

    /// The fiber's task panicked
    Panicked { id: FiberId, message: String },

    /// Configuration rejected by `SchedulerConfig::validate`
    InvalidConfig(&'static str),

    /// Shared stack mapping failed
    MemoryError(MemoryError),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::CapacityExceeded { capacity } => {
                write!(f, "fiber table full ({} slots)", capacity)
            }
            SchedError::StackBudgetExceeded { used, budget } => {
                write!(f, "fiber stack budget exceeded: {} bytes in use, {} allowed", used, budget)
            }
            SchedError::InvalidHandle(id) => write!(f, "invalid fiber handle {}", id),
            SchedError::DoubleCompletion(id) => write!(f, "fiber {} completed twice", id),
            SchedError::NotInFiber => write!(f, "not running inside a fiber"),
            SchedError::AlreadyInitialized => write!(f, "scheduler already initialized on this thread"),
            SchedError::NotInitialized => write!(f, "scheduler not initialized on this thread"),
            SchedError::Panicked { id, message } => write!(f, "fiber {} panicked: {}", id, message),
            SchedError::InvalidConfig(why) => write!(f, "invalid scheduler config: {}", why),
            SchedError::MemoryError(e) => write!(f, "memory error: {}", e),
        }
    }
}

impl std::error::Error for SchedError {}

/// Shared stack mapping errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap failed
    AllocationFailed,

    /// mprotect failed
    ProtectionFailed,

    /// munmap failed
    ReleaseFailed,

    /// Requested size overflows the address space
    InvalidSize,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "memory allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "memory protection change failed"),
            MemoryError::ReleaseFailed => write!(f, "memory release failed"),
            MemoryError::InvalidSize => write!(f, "invalid region size"),
        }
    }
}

impl From<MemoryError> for SchedError {
    fn from(e: MemoryError) -> Self {
        SchedError::MemoryError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SchedError::CapacityExceeded { capacity: 16 };
        assert_eq!(format!("{}", e), "fiber table full (16 slots)");

        let e = SchedError::MemoryError(MemoryError::AllocationFailed);
        assert_eq!(format!("{}", e), "memory error: memory allocation failed");

        let e = SchedError::Panicked { id: FiberId::new(2), message: "boom".into() };
        assert_eq!(format!("{}", e), "fiber 2 panicked: boom");
    }

    #[test]
    fn test_error_conversion() {
        let sched_err: SchedError = MemoryError::ProtectionFailed.into();
        assert!(matches!(sched_err, SchedError::MemoryError(MemoryError::ProtectionFailed)));
    }
}
