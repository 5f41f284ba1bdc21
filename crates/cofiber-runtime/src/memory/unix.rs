//! Unix stack mapping using mmap

use super::{round_up, SharedStack};
use cofiber_core::constants::DEFAULT_PAGE_SIZE;
use cofiber_core::error::{MemoryError, SchedResult};

/// OS page size, falling back to the platform default
pub fn page_size() -> usize {
    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ret > 0 {
        ret as usize
    } else {
        DEFAULT_PAGE_SIZE
    }
}

impl SharedStack {
    /// Map a stack of at least `size` bytes plus one guard page
    ///
    /// The size is rounded up to the page size.
    pub fn new(size: usize) -> SchedResult<Self> {
        if size == 0 {
            return Err(MemoryError::InvalidSize.into());
        }

        let page = page_size();
        let size = round_up(size, page);
        let guard = page;
        let total = size.checked_add(guard).ok_or(MemoryError::InvalidSize)?;

        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                total,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed.into());
        }

        // Guard page at the low end; stacks grow down into it
        let ret = unsafe { libc::mprotect(base, guard, libc::PROT_NONE) };
        if ret != 0 {
            unsafe { libc::munmap(base, total) };
            return Err(MemoryError::ProtectionFailed.into());
        }

        Ok(Self {
            base: base as *mut u8,
            total,
            size,
            guard,
        })
    }
}

impl Drop for SharedStack {
    fn drop(&mut self) {
        let ret = unsafe { libc::munmap(self.base as *mut libc::c_void, self.total) };
        if ret != 0 {
            cofiber_core::kwarn!("munmap of shared stack failed: {}", MemoryError::ReleaseFailed);
        }
    }
}
