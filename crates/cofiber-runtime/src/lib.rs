//! # cofiber-runtime
//!
//! Platform-specific runtime for the cofiber scheduler.
//!
//! This crate provides:
//! - Context switching (architecture-specific assembly)
//! - The shared stack mapping (mmap with a guard page)
//! - The round-robin scheduler with copy-in/copy-out stack snapshots
//! - Configuration (build-time defaults plus environment overrides)

pub mod config;
pub mod context;
pub mod memory;
pub mod arch;
pub mod fiber;
pub mod scheduler;
pub mod tls;

// Re-exports
pub use config::SchedulerConfig;
pub use context::{EntryFn, HardwareContext, NativeContext};
pub use fiber::{FiberHandle, FiberStats};
pub use memory::{page_size, SharedStack};
pub use scheduler::{
    Scheduler,
    yield_now,
    spawn,
    try_spawn,
    join,
    current_id,
    is_in_fiber,
    fiber_state,
};
