//! # cofiber-core
//!
//! Core types for the cofiber scheduler.
//!
//! This crate is platform-agnostic and contains no OS-specific code or raw
//! pointer arithmetic. Context switching and the shared stack mapping live
//! in `cofiber-runtime`.
//!
//! ## Modules
//!
//! - `id` - Fiber identifier type
//! - `state` - Fiber state machine
//! - `snapshot` - Copy-out/copy-in stack snapshots
//! - `slot` - Fixed-capacity slot table (fiber arena)
//! - `completion` - One-shot completion signal for joiners
//! - `error` - Error types
//! - `kprint` - Leveled stderr logging tagged with the running fiber
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod snapshot;
pub mod slot;
pub mod completion;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::FiberId;
pub use state::FiberState;
pub use snapshot::StackSnapshot;
pub use slot::SlotTable;
pub use completion::Completion;
pub use error::{MemoryError, SchedError, SchedResult};
pub use env::{env_get, env_get_bool, env_get_size};

/// Constants for table and stack sizing
pub mod constants {
    /// Hard upper bound on the fiber table capacity
    pub const MAX_FIBERS_LIMIT: usize = 4096;

    /// Smallest shared stack accepted by the configuration
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Stack alignment required by both supported ABIs
    pub const STACK_ALIGN: usize = 16;

    cfg_if::cfg_if! {
        if #[cfg(all(target_os = "macos", target_arch = "aarch64"))] {
            /// Page size assumed when the OS cannot be asked
            pub const DEFAULT_PAGE_SIZE: usize = 16 * 1024;
        } else {
            /// Page size assumed when the OS cannot be asked
            pub const DEFAULT_PAGE_SIZE: usize = 4096;
        }
    }
}
