//! Architecture-specific context switching
//!
//! Naked assembly that saves and restores callee-saved registers during
//! fiber switches.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
    } else {
        compile_error!("cofiber supports x86_64 and aarch64 only");
    }
}
