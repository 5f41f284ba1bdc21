//! Fiber record and handle

use std::rc::Rc;

use cofiber_core::{Completion, FiberId, FiberState, SchedError, SchedResult, StackSnapshot};

use crate::context::HardwareContext;
use crate::tls;

/// Boxed task body, invoked exactly once
pub(crate) type Task = Box<dyn FnOnce() + 'static>;

/// One fiber, owned by its slot in the scheduler's table
pub(crate) struct Fiber<C: HardwareContext> {
    pub(crate) id: FiberId,
    state: FiberState,
    pub(crate) context: C,
    pub(crate) snapshot: StackSnapshot,
    task: Option<Task>,
    pub(crate) completion: Rc<Completion>,
    resumes: u64,
}

impl<C: HardwareContext> Fiber<C> {
    pub(crate) fn new(id: FiberId, task: Task) -> Self {
        Self {
            id,
            state: FiberState::Ready,
            context: C::default(),
            snapshot: StackSnapshot::new(),
            task: Some(task),
            completion: Rc::new(Completion::new(id)),
            resumes: 0,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> FiberState {
        self.state
    }

    /// Move along the state machine
    ///
    /// Panics on a transition the state machine does not allow.
    pub(crate) fn set_state(&mut self, next: FiberState) {
        assert!(
            self.state.can_transition_to(next),
            "fiber {}: illegal transition {} -> {}",
            self.id,
            self.state,
            next
        );
        self.state = next;
        if next == FiberState::Running {
            self.resumes += 1;
        }
    }

    /// Take the task for its single invocation
    pub(crate) fn take_task(&mut self) -> Option<Task> {
        self.task.take()
    }

    pub(crate) fn stats(&self) -> FiberStats {
        FiberStats {
            id: self.id,
            state: self.state,
            stack_used: self.snapshot.used_size(),
            stack_capacity: self.snapshot.capacity(),
            resumes: self.resumes,
            joiners: self.completion.waiters(),
        }
    }
}

/// Point-in-time view of a live fiber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiberStats {
    pub id: FiberId,
    pub state: FiberState,
    /// Bytes held in the snapshot at the last suspension
    pub stack_used: usize,
    /// Allocated snapshot size; never shrinks
    pub stack_capacity: usize,
    /// Times the fiber has been switched to
    pub resumes: u64,
    /// Flows currently blocked in `join` on this fiber
    pub joiners: usize,
}

/// Handle to a spawned fiber
///
/// Clones share the same completion signal, so any of them can be joined
/// and all observe the same outcome.
#[derive(Clone)]
pub struct FiberHandle {
    id: FiberId,
    completion: Rc<Completion>,
}

impl FiberHandle {
    pub(crate) fn new(id: FiberId, completion: Rc<Completion>) -> Self {
        Self { id, completion }
    }

    /// Id of the fiber (the slot may be reused once it is Dead)
    #[inline]
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Has the fiber reached Dead?
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.completion.is_fired()
    }

    /// Block until the fiber is Dead and return its outcome
    ///
    /// Inside a fiber this is a suspension point. From the root flow it
    /// drives the scheduler until the target finishes. Joining an already
    /// finished fiber returns immediately, as often as asked.
    pub fn join(&self) -> SchedResult<()> {
        if let Some(outcome) = self.completion.outcome() {
            return outcome;
        }
        tls::with_current(|sched| sched.join(&self.completion))
            .unwrap_or(Err(SchedError::NotInitialized))
    }

    pub(crate) fn completion(&self) -> &Rc<Completion> {
        &self.completion
    }
}

impl std::fmt::Debug for FiberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FiberHandle")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}
