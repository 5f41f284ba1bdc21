//! # cofiber - cooperative fibers on a shared stack
//!
//! Single-thread green threads that all run on one shared stack region.
//! A fiber's live stack span is copied out when it yields and copied back
//! in when it resumes, so memory use is the shared region plus whatever
//! each suspended fiber actually had in use.
//!
//! ## Features
//!
//! - **Deterministic**: round-robin in slot order, switches only at
//!   `yield_now` or when a task returns
//! - **Bounded**: fixed fiber table (default 16) and a fixed stack budget
//!   (default 1 MiB) per fiber
//! - **Joinable**: any number of flows may `join` a fiber, before or after
//!   it finishes
//! - **Panic-safe**: a panicking task becomes a `Panicked` join outcome
//!
//! ## Quick Start
//!
//! ```ignore
//! use cofiber::{Runtime, spawn, yield_now};
//!
//! fn main() {
//!     let runtime = Runtime::new(Default::default()).unwrap();
//!
//!     runtime.block_on(|| {
//!         for name in ["ping", "pong"] {
//!             spawn(move || {
//!                 for i in 0..3 {
//!                     println!("{} {}", name, i);
//!                     yield_now();
//!                 }
//!             });
//!         }
//!     });
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │              spawn(), yield_now(), join()                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scheduler (root flow)                       │
//! │     slot table, round-robin pick, copy-in / copy-out        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │  Fiber 0  │      │  Fiber 1  │      │  Fiber N  │
//!    │ snapshot  │      │ snapshot  │      │ snapshot  │
//!    └───────────┘      └───────────┘      └───────────┘
//!                              │
//!                              ▼
//!    ┌─────────────────────────────────────────────────────────┐
//!    │                    Shared Stack                         │
//!    │        one mmap region + guard page, owned by           │
//!    │              whichever fiber is Running                 │
//!    └─────────────────────────────────────────────────────────┘
//! ```

// Re-export core types
pub use cofiber_core::{FiberId, FiberState, SchedError, SchedResult, MemoryError};

// Re-export leveled logging macros (COF_LOG_LEVEL)
pub use cofiber_core::{kerror, kwarn, kinfo, kdebug, ktrace};

// Re-export env utilities
pub use cofiber_core::{env_get, env_get_bool, env_get_size};

// Re-export runtime types
pub use cofiber_runtime::{
    SchedulerConfig,
    Scheduler,
    FiberHandle,
    FiberStats,
    HardwareContext,
    NativeContext,
    EntryFn,
};

use cofiber_runtime::scheduler;

/// Owns the thread's scheduler for the duration of a program
///
/// A thin wrapper for the common shape: spawn from the root flow, then run
/// every fiber to completion.
pub struct Runtime {
    scheduler: Scheduler,
}

impl Runtime {
    /// Create and install a scheduler on the current thread
    pub fn new(config: SchedulerConfig) -> SchedResult<Self> {
        Ok(Self {
            scheduler: Scheduler::new(config)?,
        })
    }

    /// Run `f` on the root flow, then drive every fiber until all are Dead
    pub fn block_on<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let result = f();
        self.scheduler.run();
        result
    }

    /// The underlying scheduler
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

/// Spawn a new fiber on this thread's scheduler
///
/// The fiber starts Ready and first runs when the scheduler reaches its
/// slot. Panics if the table is full or no scheduler is installed; use
/// [`try_spawn`] to get the error instead.
///
/// # Example
///
/// ```ignore
/// use cofiber::{spawn, yield_now};
///
/// let h = spawn(|| {
///     println!("step 1");
///     yield_now();
///     println!("step 2");
/// });
/// h.join().unwrap();
/// ```
pub fn spawn<F>(f: F) -> FiberHandle
where
    F: FnOnce() + 'static,
{
    scheduler::spawn(f)
}

/// Spawn a new fiber, returning `CapacityExceeded` or `NotInitialized`
/// instead of panicking
pub fn try_spawn<F>(f: F) -> SchedResult<FiberHandle>
where
    F: FnOnce() + 'static,
{
    scheduler::try_spawn(f)
}

/// Yield execution to the next fiber
///
/// A no-op when the caller is the only live fiber. Panics outside a fiber.
#[inline]
pub fn yield_now() {
    scheduler::yield_now()
}

/// Wait for a fiber to finish
///
/// Inside a fiber this suspends the caller until the target is Dead; on the
/// root flow it runs the scheduler until then.
#[inline]
pub fn join(handle: &FiberHandle) -> SchedResult<()> {
    scheduler::join(handle)
}

/// Get the current fiber's ID
///
/// Returns `FiberId::NONE` if not running in a fiber.
#[inline]
pub fn current_id() -> FiberId {
    scheduler::current_id()
}

/// Check if currently executing within a fiber
#[inline]
pub fn is_in_fiber() -> bool {
    scheduler::is_in_fiber()
}
