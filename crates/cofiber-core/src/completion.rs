//! One-shot completion signal
//!
//! Every fiber owns one `Completion`, shared with all of its handles. It is
//! fired exactly once, when the fiber becomes Dead, and records the outcome
//! so that any number of joiners (before or after the fact) observe it.
//!
//! Waiting is not done here: in a single-flow runtime a waiter must yield to
//! the scheduler rather than block, so joiners poll `is_fired` between
//! suspension points.

use core::cell::{Cell, OnceCell};
use crate::id::FiberId;
use crate::error::{SchedError, SchedResult};

/// Broadcast, fire-once completion record
#[derive(Debug)]
pub struct Completion {
    /// Fiber this signal belongs to
    id: FiberId,

    /// Outcome of the task, set exactly once
    outcome: OnceCell<SchedResult<()>>,

    /// Flows currently waiting in `join`
    waiters: Cell<usize>,
}

impl Completion {
    /// Create an unfired signal for fiber `id`
    pub const fn new(id: FiberId) -> Self {
        Self {
            id,
            outcome: OnceCell::new(),
            waiters: Cell::new(0),
        }
    }

    /// Fiber this signal belongs to
    #[inline]
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Fire the signal
    ///
    /// A second call fails with `DoubleCompletion` and leaves the first
    /// outcome in place.
    pub fn fire(&self, outcome: SchedResult<()>) -> SchedResult<()> {
        self.outcome
            .set(outcome)
            .map_err(|_| SchedError::DoubleCompletion(self.id))
    }

    /// Has the fiber reached Dead?
    #[inline]
    pub fn is_fired(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Recorded outcome, if fired
    pub fn outcome(&self) -> Option<SchedResult<()>> {
        self.outcome.get().cloned()
    }

    /// Register a waiter
    #[inline]
    pub fn add_waiter(&self) {
        self.waiters.set(self.waiters.get() + 1);
    }

    /// Unregister a waiter
    #[inline]
    pub fn remove_waiter(&self) {
        self.waiters.set(self.waiters.get().saturating_sub(1));
    }

    /// Number of flows currently blocked in `join` on this fiber
    #[inline]
    pub fn waiters(&self) -> usize {
        self.waiters.get()
    }
}
