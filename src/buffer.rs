//! Resizable byte storage with an edit journal.
//!
//! A buffer is one of three things:
//!
//! - **Owned** — a raw block managed through [`Allocator`] hooks, plus the
//!   journal that records every size-changing edit.
//! - **Zero-copy** — a borrowed region that may be overwritten in place
//!   but never grows or shrinks; it reports the shared empty journal.
//! - **Invalid** — the constructor-failure sentinel. Its recorded error
//!   is `ALLOC`; every operation on it fails with `INVALID`.
//!
//! Mutation contract: a failed edit leaves the bytes identical to the
//! pre-call state. Growth reallocates before anything moves, so an
//! allocation failure returns with the buffer untouched; a shrink that
//! cannot release memory keeps the oversized block (unused capacity is
//! not a correctness problem). Journal entries are appended after the
//! bytes have moved.

use crate::alloc::Allocator;
use crate::error::Error;
use crate::journal::{Journal, NO_JOURNAL};

enum Repr<'a> {
    Owned {
        alloc: Allocator,
        block: *mut u8,
        len: usize,
        journal: Journal,
    },
    ZeroCopy {
        bytes: &'a mut [u8],
    },
    Invalid,
}

/// Byte storage for one wire-format message tree.
pub struct Buffer<'a> {
    repr: Repr<'a>,
}

impl Drop for Buffer<'_> {
    fn drop(&mut self) {
        if let Repr::Owned { alloc, block, .. } = &self.repr {
            alloc.release(*block);
        }
    }
}

impl core::fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("version", &self.version())
            .field("valid", &self.is_valid())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction
// ─────────────────────────────────────────────────────────────────────────────

impl Buffer<'static> {
    /// Copy `data` into a fresh owned buffer using the default allocator.
    pub fn copy_from(data: &[u8]) -> Buffer<'static> {
        Buffer::copy_from_in(Allocator::system(), data)
    }

    /// Copy `data` into a fresh owned buffer using `alloc`.
    ///
    /// On allocation failure the result is the invalid buffer.
    pub fn copy_from_in(alloc: Allocator, data: &[u8]) -> Buffer<'static> {
        if data.is_empty() {
            return Buffer::empty_in(alloc);
        }
        let block = alloc.allocate(data.len());
        if block.is_null() {
            return Buffer::invalid();
        }
        unsafe {
            block.copy_from_nonoverlapping(data.as_ptr(), data.len());
        }
        Buffer {
            repr: Repr::Owned {
                alloc,
                block,
                len: data.len(),
                journal: Journal::new(),
            },
        }
    }

    /// A zero-length owned buffer.
    pub fn empty() -> Buffer<'static> {
        Buffer::empty_in(Allocator::system())
    }

    /// A zero-length owned buffer using `alloc`.
    pub fn empty_in(alloc: Allocator) -> Buffer<'static> {
        Buffer {
            repr: Repr::Owned {
                alloc,
                block: core::ptr::null_mut(),
                len: 0,
                journal: Journal::new(),
            },
        }
    }

    /// The always-failing sentinel buffer.
    pub fn invalid() -> Buffer<'static> {
        Buffer { repr: Repr::Invalid }
    }
}

impl<'a> Buffer<'a> {
    /// Borrow `bytes` as a fixed-size buffer. In-place overwrites are
    /// allowed; anything that would change the size fails with `ALLOC`.
    pub fn zero_copy(bytes: &'a mut [u8]) -> Buffer<'a> {
        Buffer {
            repr: Repr::ZeroCopy { bytes },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accessors
// ─────────────────────────────────────────────────────────────────────────────

impl<'a> Buffer<'a> {
    /// Current contents. Empty for the invalid buffer.
    pub fn data(&self) -> &[u8] {
        match &self.repr {
            Repr::Owned { block, len, .. } => {
                if *len == 0 {
                    &[]
                } else {
                    unsafe { core::slice::from_raw_parts(*block, *len) }
                }
            }
            Repr::ZeroCopy { bytes } => bytes,
            Repr::Invalid => &[],
        }
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        match &mut self.repr {
            Repr::Owned { block, len, .. } => {
                if *len == 0 {
                    &mut []
                } else {
                    unsafe { core::slice::from_raw_parts_mut(*block, *len) }
                }
            }
            Repr::ZeroCopy { bytes } => bytes,
            Repr::Invalid => &mut [],
        }
    }

    /// Current size in bytes.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Owned { len, .. } => *len,
            Repr::ZeroCopy { bytes } => bytes.len(),
            Repr::Invalid => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.repr, Repr::Invalid)
    }

    /// Construction-time failure, if any.
    pub fn error(&self) -> Option<Error> {
        match self.repr {
            Repr::Invalid => Some(Error::Alloc),
            _ => None,
        }
    }

    /// The edit journal. Zero-copy and invalid buffers share the static
    /// empty journal.
    pub fn journal(&self) -> &Journal {
        match &self.repr {
            Repr::Owned { journal, .. } => journal,
            _ => &NO_JOURNAL,
        }
    }

    /// Journal length — the version live parts align against.
    pub fn version(&self) -> usize {
        self.journal().len()
    }

    pub(crate) fn journal_mut(&mut self) -> Option<&mut Journal> {
        match &mut self.repr {
            Repr::Owned { journal, .. } => Some(journal),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutation
// ─────────────────────────────────────────────────────────────────────────────

impl<'a> Buffer<'a> {
    /// Replace `[start, end)` with `src`, journaling the size change.
    pub fn write(&mut self, start: usize, end: usize, src: &[u8]) -> Result<(), Error> {
        self.write_parts(start, start, end, &[], src)
    }

    /// Append `src` at the tail.
    ///
    /// Not journaled: no byte after the tail exists whose offset would
    /// need re-aligning. Parts spanning to the old tail keep their extent.
    pub fn append(&mut self, src: &[u8]) -> Result<(), Error> {
        let len = self.len();
        self.splice(len, len, &[], src)?;
        Ok(())
    }

    /// Delete `[start, end)`, journaling a clear entry. Clearing the
    /// whole buffer releases the allocation.
    pub fn clear(&mut self, start: usize, end: usize) -> Result<(), Error> {
        self.write_parts(start, start, end, &[], &[])
    }

    /// Replace `[start, mid)` with `head` and `[mid, end)` with `tail` in
    /// one splice, journaling the two ranges separately. Field writes use
    /// this to keep a re-encoded length prefix distinguishable from the
    /// payload change during replay.
    pub(crate) fn write_parts(
        &mut self,
        start: usize,
        mid: usize,
        end: usize,
        head: &[u8],
        tail: &[u8],
    ) -> Result<(), Error> {
        debug_assert!(start <= mid);
        let head_delta = head.len() as isize - (mid - start) as isize;
        let tail_delta = tail.len() as isize - (end - mid) as isize;
        self.splice(start, end, head, tail)?;
        if let Some(journal) = self.journal_mut() {
            if head_delta != 0 {
                journal.log(start, mid, head_delta);
            }
            if tail_delta != 0 {
                journal.log(
                    (mid as isize + head_delta) as usize,
                    (end as isize + head_delta) as usize,
                    tail_delta,
                );
            }
        }
        Ok(())
    }

    /// Raw range replacement: `[start, end)` becomes `head ++ tail`.
    /// Performs the reallocation and suffix move; journals nothing.
    fn splice(&mut self, start: usize, end: usize, head: &[u8], tail: &[u8]) -> Result<(), Error> {
        let src_len = head.len() + tail.len();
        match &mut self.repr {
            Repr::Invalid => Err(Error::Invalid),
            Repr::ZeroCopy { bytes } => {
                if start > end || end > bytes.len() {
                    return Err(Error::Offset);
                }
                if src_len != end - start {
                    return Err(Error::Alloc);
                }
                bytes[start..start + head.len()].copy_from_slice(head);
                bytes[start + head.len()..end].copy_from_slice(tail);
                Ok(())
            }
            Repr::Owned {
                alloc,
                block,
                len,
                ..
            } => {
                if start > end || end > *len {
                    return Err(Error::Offset);
                }
                let delta = src_len as isize - (end - start) as isize;
                let new_len = (*len as isize + delta) as usize;

                if delta > 0 {
                    // Grow first so a failed allocation changes nothing.
                    let grown = alloc.resize(*block, new_len);
                    if grown.is_null() {
                        return Err(Error::Alloc);
                    }
                    *block = grown;
                    unsafe {
                        // Suffix beyond the replaced range moves right.
                        core::ptr::copy(
                            block.add(end),
                            block.add(end + delta as usize),
                            *len - end,
                        );
                    }
                } else if delta < 0 {
                    unsafe {
                        core::ptr::copy(
                            block.add(end),
                            block.add((end as isize + delta) as usize),
                            *len - end,
                        );
                    }
                }
                unsafe {
                    block
                        .add(start)
                        .copy_from_nonoverlapping(head.as_ptr(), head.len());
                    block
                        .add(start + head.len())
                        .copy_from_nonoverlapping(tail.as_ptr(), tail.len());
                }
                if delta < 0 {
                    if new_len == 0 {
                        alloc.release(*block);
                        *block = core::ptr::null_mut();
                    } else {
                        // A failed shrink keeps the oversized block.
                        let shrunk = alloc.resize(*block, new_len);
                        if !shrunk.is_null() {
                            *block = shrunk;
                        }
                    }
                }
                *len = new_len;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Entry;

    #[test]
    fn copy_from_owns_bytes() {
        let source = [1u8, 2, 3];
        let buf = Buffer::copy_from(&source);
        assert!(buf.is_valid());
        assert_eq!(buf.data(), &source);
        assert_eq!(buf.version(), 0);
    }

    #[test]
    fn same_size_write_is_not_journaled() {
        let mut buf = Buffer::copy_from(&[1, 2, 3, 4]);
        buf.write(1, 3, &[9, 9]).unwrap();
        assert_eq!(buf.data(), &[1, 9, 9, 4]);
        assert_eq!(buf.version(), 0);
    }

    #[test]
    fn growing_write_journals_delta() {
        let mut buf = Buffer::copy_from(&[0x08, 0x7F]);
        buf.write(1, 2, &[0x80, 0x01]).unwrap();
        assert_eq!(buf.data(), &[0x08, 0x80, 0x01]);
        assert_eq!(
            buf.journal().entries(),
            &[Entry {
                origin: 1,
                offset: 2,
                delta: 1
            }]
        );
    }

    #[test]
    fn shrinking_write_moves_suffix() {
        let mut buf = Buffer::copy_from(&[1, 2, 3, 4, 5]);
        buf.write(1, 4, &[8]).unwrap();
        assert_eq!(buf.data(), &[1, 8, 5]);
        assert_eq!(
            buf.journal().entries(),
            &[Entry {
                origin: 1,
                offset: 4,
                delta: -2
            }]
        );
    }

    #[test]
    fn insert_at_front() {
        let mut buf = Buffer::copy_from(&[0x10, 0x01]);
        buf.write(0, 0, &[0x08, 0x7F]).unwrap();
        assert_eq!(buf.data(), &[0x08, 0x7F, 0x10, 0x01]);
        assert_eq!(buf.version(), 1);
    }

    #[test]
    fn append_is_not_journaled() {
        let mut buf = Buffer::copy_from(&[1, 2]);
        buf.append(&[3, 4]).unwrap();
        assert_eq!(buf.data(), &[1, 2, 3, 4]);
        assert_eq!(buf.version(), 0);

        let mut empty = Buffer::empty();
        empty.append(&[7]).unwrap();
        assert_eq!(empty.data(), &[7]);
    }

    #[test]
    fn clear_journals_clear_entry() {
        let mut buf = Buffer::copy_from(&[1, 2, 3, 4]);
        buf.clear(1, 3).unwrap();
        assert_eq!(buf.data(), &[1, 4]);
        assert_eq!(
            buf.journal().entries(),
            &[Entry {
                origin: 1,
                offset: 3,
                delta: -2
            }]
        );
        assert!(buf.journal().entries()[0].is_clear());
    }

    #[test]
    fn clear_everything_releases() {
        let mut buf = Buffer::copy_from(&[1, 2, 3]);
        buf.clear(0, 3).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.version(), 1);
    }

    #[test]
    fn range_checks() {
        let mut buf = Buffer::copy_from(&[1, 2, 3]);
        assert_eq!(buf.write(2, 1, &[]), Err(Error::Offset));
        assert_eq!(buf.write(0, 4, &[]), Err(Error::Offset));
        assert_eq!(buf.data(), &[1, 2, 3]);
    }

    #[test]
    fn zero_copy_rejects_resizing() {
        let mut bytes = [1u8, 2, 3, 4];
        let mut buf = Buffer::zero_copy(&mut bytes);
        buf.write(1, 3, &[9, 8]).unwrap();
        assert_eq!(buf.data(), &[1, 9, 8, 4]);

        assert_eq!(buf.write(1, 3, &[7]), Err(Error::Alloc));
        assert_eq!(buf.append(&[5]), Err(Error::Alloc));
        assert_eq!(buf.clear(0, 4), Err(Error::Alloc));
        // Bytes untouched by the failures.
        assert_eq!(buf.data(), &[1, 9, 8, 4]);
        assert_eq!(buf.version(), 0);
    }

    #[test]
    fn invalid_buffer_fails_everything() {
        let mut buf = Buffer::invalid();
        assert!(!buf.is_valid());
        assert_eq!(buf.error(), Some(Error::Alloc));
        assert_eq!(buf.write(0, 0, &[1]), Err(Error::Invalid));
        assert_eq!(buf.append(&[1]), Err(Error::Invalid));
        assert_eq!(buf.clear(0, 0), Err(Error::Invalid));
    }

    #[test]
    fn failed_growth_leaves_bytes() {
        fn no_alloc(_: *mut (), _: usize) -> *mut u8 {
            core::ptr::null_mut()
        }
        fn no_resize(_: *mut (), _: *mut u8, _: usize) -> *mut u8 {
            core::ptr::null_mut()
        }
        // Allocation succeeds at construction, every resize fails.
        let alloc = Allocator {
            resize_fn: Some(no_resize),
            ..Allocator::system()
        };
        let mut buf = Buffer::copy_from_in(alloc, &[1, 2, 3]);
        assert!(buf.is_valid());
        assert_eq!(buf.write(1, 2, &[8, 9]), Err(Error::Alloc));
        assert_eq!(buf.data(), &[1, 2, 3]);
        assert_eq!(buf.version(), 0);

        // Shrink tolerates the failing resize hook.
        buf.write(1, 3, &[5]).unwrap();
        assert_eq!(buf.data(), &[1, 5]);
        assert_eq!(buf.version(), 1);

        let failing = Allocator {
            alloc_fn: Some(no_alloc),
            ..Allocator::system()
        };
        assert!(!Buffer::copy_from_in(failing, &[1]).is_valid());
    }

    #[test]
    fn split_write_journals_two_entries() {
        let mut buf = Buffer::copy_from(&[0x42, 0x02, 0xAA, 0xBB, 0x10, 0x01]);
        // Prefix [1,2) grows to two bytes, payload [2,4) grows to 130.
        let payload = [0xCCu8; 130];
        buf.write_parts(1, 2, 4, &[0x82, 0x01], &payload).unwrap();
        assert_eq!(buf.len(), 6 - 3 + 2 + 130);
        assert_eq!(&buf.data()[..3], &[0x42, 0x82, 0x01]);
        assert_eq!(&buf.data()[3..133], &payload[..]);
        assert_eq!(&buf.data()[133..], &[0x10, 0x01]);
        assert_eq!(
            buf.journal().entries(),
            &[
                Entry {
                    origin: 1,
                    offset: 2,
                    delta: 1
                },
                Entry {
                    origin: 3,
                    offset: 5,
                    delta: 128
                },
            ]
        );
    }
}
