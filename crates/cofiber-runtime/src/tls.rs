//! Thread-local pointer to the installed scheduler
//!
//! Free functions (`yield_now`, `spawn`, `join`, ...) and `FiberHandle::join`
//! reach the scheduler through here. At most one scheduler is installed per
//! OS thread.

use std::cell::Cell;
use std::ptr::NonNull;

use cofiber_core::{SchedError, SchedResult};

use crate::scheduler::Dispatch;

thread_local! {
    static CURRENT: Cell<Option<NonNull<dyn Dispatch>>> = const { Cell::new(None) };
}

/// Install `sched` as this thread's scheduler
///
/// The caller must call `uninstall` before `sched` is dropped.
pub(crate) fn install(sched: NonNull<dyn Dispatch>) -> SchedResult<()> {
    CURRENT.with(|cell| {
        if cell.get().is_some() {
            return Err(SchedError::AlreadyInitialized);
        }
        cell.set(Some(sched));
        Ok(())
    })
}

/// Remove the installed scheduler
pub(crate) fn uninstall() {
    CURRENT.with(|cell| cell.set(None));
}

/// Is a scheduler installed on this thread?
#[inline]
pub fn is_installed() -> bool {
    CURRENT.with(|cell| cell.get().is_some())
}

/// Run `f` against the installed scheduler
///
/// The pointer is copied out of the cell first; `f` may switch fibers.
pub(crate) fn with_current<R>(f: impl FnOnce(&dyn Dispatch) -> R) -> Option<R> {
    let ptr = CURRENT.with(|cell| cell.get())?;
    // SAFETY: installed schedulers stay alive until they uninstall themselves
    Some(f(unsafe { ptr.as_ref() }))
}
