//! Allocator hooks for buffer storage.
//!
//! Buffers route every byte-block operation through an [`Allocator`]: a
//! plain-data struct of optional function hooks plus an opaque state
//! pointer. When a hook is `None` the default path is used, which wraps
//! the platform allocator (`malloc` / `realloc` / `free`).
//!
//! The caller guarantees the allocator (and whatever `opaque` points at)
//! outlives every buffer created with it.

use core::fmt;

/// Allocation hooks. `None` hooks fall through to the platform allocator.
///
/// Hooks report failure by returning null; callers translate that into
/// [`Error::Alloc`](crate::error::Error::Alloc) and leave the buffer
/// bytes untouched.
#[derive(Clone, Copy)]
pub struct Allocator {
    /// Allocate `size` fresh bytes. Never called with `size == 0`.
    pub alloc_fn: Option<fn(opaque: *mut (), size: usize) -> *mut u8>,
    /// Resize `block` to `size` bytes, preserving the common prefix.
    /// A null return leaves the original block valid.
    pub resize_fn: Option<fn(opaque: *mut (), block: *mut u8, size: usize) -> *mut u8>,
    /// Release `block`.
    pub free_fn: Option<fn(opaque: *mut (), block: *mut u8)>,
    /// State pointer handed to every hook.
    pub opaque: *mut (),
}

// SAFETY: the hooks are plain function pointers and the opaque pointer is
// only dereferenced by caller-supplied hooks; the crate-wide contract is
// single-threaded access (or external exclusion).
unsafe impl Send for Allocator {}
unsafe impl Sync for Allocator {}

impl Default for Allocator {
    fn default() -> Self {
        Allocator {
            alloc_fn: None,
            resize_fn: None,
            free_fn: None,
            opaque: core::ptr::null_mut(),
        }
    }
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("alloc_fn", &self.alloc_fn.map(|_| "<fn>"))
            .field("resize_fn", &self.resize_fn.map(|_| "<fn>"))
            .field("free_fn", &self.free_fn.map(|_| "<fn>"))
            .finish()
    }
}

impl Allocator {
    /// The process-wide default allocator (platform malloc family).
    pub const fn system() -> Self {
        Allocator {
            alloc_fn: None,
            resize_fn: None,
            free_fn: None,
            opaque: core::ptr::null_mut(),
        }
    }

    /// Allocate `size` bytes; null on failure. `size` must be non-zero.
    pub fn allocate(&self, size: usize) -> *mut u8 {
        debug_assert!(size > 0);
        match self.alloc_fn {
            Some(f) => f(self.opaque, size),
            None => unsafe { libc::malloc(size) as *mut u8 },
        }
    }

    /// Resize `block` to `size` bytes; null on failure (original block
    /// stays valid). A null `block` behaves as a fresh allocation.
    pub fn resize(&self, block: *mut u8, size: usize) -> *mut u8 {
        debug_assert!(size > 0);
        if block.is_null() {
            return self.allocate(size);
        }
        match self.resize_fn {
            Some(f) => f(self.opaque, block, size),
            None => unsafe { libc::realloc(block as *mut libc::c_void, size) as *mut u8 },
        }
    }

    /// Release `block`. Null is a no-op.
    pub fn release(&self, block: *mut u8) {
        if block.is_null() {
            return;
        }
        match self.free_fn {
            Some(f) => f(self.opaque, block),
            None => unsafe { libc::free(block as *mut libc::c_void) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_roundtrip() {
        let alloc = Allocator::system();
        let block = alloc.allocate(4);
        assert!(!block.is_null());
        unsafe {
            block.copy_from_nonoverlapping([1u8, 2, 3, 4].as_ptr(), 4);
        }
        let grown = alloc.resize(block, 8);
        assert!(!grown.is_null());
        unsafe {
            assert_eq!(core::slice::from_raw_parts(grown, 4), &[1, 2, 3, 4]);
        }
        alloc.release(grown);
    }

    #[test]
    fn failing_hooks_return_null() {
        fn no_alloc(_: *mut (), _: usize) -> *mut u8 {
            core::ptr::null_mut()
        }
        let alloc = Allocator {
            alloc_fn: Some(no_alloc),
            ..Allocator::default()
        };
        assert!(alloc.allocate(16).is_null());
        // resize of a null block routes through alloc_fn.
        assert!(alloc.resize(core::ptr::null_mut(), 16).is_null());
    }
}
