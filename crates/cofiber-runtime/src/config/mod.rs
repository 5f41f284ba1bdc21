//! Scheduler configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls in code
//! 2. Environment variables (runtime)
//! 3. User's config file named by `COF_CONFIG_RS` (compile-time)
//! 4. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use cofiber_runtime::SchedulerConfig;
//!
//! let config = SchedulerConfig::from_env()
//!     .max_fibers(32)
//!     .stack_size(256 * 1024);
//! ```
//!
//! Both values are fixed once a `Scheduler` is built from the config.

pub mod defaults;

use cofiber_core::constants::{MAX_FIBERS_LIMIT, MIN_STACK_SIZE};
use cofiber_core::env::{env_get, env_get_bool, env_get_size};
use cofiber_core::error::{SchedError, SchedResult};

/// Scheduler configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Fiber table capacity
    pub max_fibers: usize,
    /// Shared stack size in bytes, which is also every fiber's stack budget
    pub stack_size: usize,
    /// Emit kdebug!/ktrace! lines for create/switch/yield/exit
    pub debug_logging: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SchedulerConfig {
    /// Library defaults only, ignoring the environment
    pub fn compiled() -> Self {
        Self {
            max_fibers: defaults::MAX_FIBERS,
            stack_size: defaults::STACK_SIZE,
            debug_logging: defaults::DEBUG_LOGGING || cfg!(feature = "debug-logging"),
        }
    }

    /// Compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `COF_MAX_FIBERS` - Fiber table capacity
    /// - `COF_STACK_SIZE` - Shared stack size (`65536`, `64K`, `1M`)
    /// - `COF_DEBUG` - Enable scheduler debug logging (0/1)
    pub fn from_env() -> Self {
        let compiled = Self::compiled();
        Self {
            max_fibers: env_get("COF_MAX_FIBERS", compiled.max_fibers),
            stack_size: env_get_size("COF_STACK_SIZE", compiled.stack_size),
            debug_logging: env_get_bool("COF_DEBUG", compiled.debug_logging),
        }
    }

    /// Set the fiber table capacity
    pub fn max_fibers(mut self, n: usize) -> Self {
        self.max_fibers = n;
        self
    }

    /// Set the shared stack size
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Enable debug logging
    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> SchedResult<()> {
        if self.max_fibers == 0 {
            return Err(SchedError::InvalidConfig("max_fibers must be at least 1"));
        }
        if self.max_fibers > MAX_FIBERS_LIMIT {
            return Err(SchedError::InvalidConfig("max_fibers exceeds MAX_FIBERS_LIMIT"));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(SchedError::InvalidConfig("stack_size below MIN_STACK_SIZE"));
        }
        Ok(())
    }
}
