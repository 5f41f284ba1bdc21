//! Fiber state machine

use core::fmt;

/// State of a fiber
///
/// The only legal sequence is `Ready -> Running -> (Suspended -> Running)* -> Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    /// Context built, never run
    Ready,

    /// Currently occupying the shared stack and executing
    Running,

    /// Yielded; stack contents live in the fiber's own snapshot
    Suspended,

    /// Task body returned (or panicked); terminal
    Dead,
}

impl FiberState {
    /// Check if resuming requires copying a snapshot back into the shared stack
    #[inline]
    pub const fn needs_copy_in(&self) -> bool {
        matches!(self, FiberState::Suspended)
    }

    /// Check whether `self -> next` is an edge of the state machine
    #[inline]
    pub const fn can_transition_to(&self, next: FiberState) -> bool {
        matches!(
            (self, next),
            (FiberState::Ready, FiberState::Running)
                | (FiberState::Running, FiberState::Suspended)
                | (FiberState::Suspended, FiberState::Running)
                | (FiberState::Running, FiberState::Dead)
        )
    }
}

impl fmt::Display for FiberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FiberState::Ready => write!(f, "READY"),
            FiberState::Running => write!(f, "RUNNING"),
            FiberState::Suspended => write!(f, "SUSPENDED"),
            FiberState::Dead => write!(f, "DEAD"),
        }
    }
}
