//! Append-only log of byte-level edits, and the replay that keeps live
//! part offsets coherent across them.
//!
//! Every size-changing edit on an owned buffer appends one entry
//! `(origin, offset, delta)`: the edited range was `[origin, offset)` and
//! the bytes from `offset` onward moved by `delta`. The journal length is
//! the buffer's version; a part stores the version it last observed and
//! replays everything newer before trusting its offsets.

use crate::part::{Diff, Offset, Version};

// ─────────────────────────────────────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded edit. `origin <= offset`, `delta != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// First byte of the edited range.
    pub origin: usize,
    /// One past the last byte of the edited range; bytes from here on
    /// shifted by `delta`.
    pub offset: usize,
    /// Signed size change. `delta == origin - offset` marks a wholesale
    /// clear of the range.
    pub delta: isize,
}

impl Entry {
    /// Whether this entry removed its whole range.
    #[inline]
    pub fn is_clear(&self) -> bool {
        self.delta == self.origin as isize - self.offset as isize
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Journal
// ─────────────────────────────────────────────────────────────────────────────

/// Initial entry capacity for a fresh journal.
const BULK: usize = 8;

/// Ordered log of edits. Growth doubles capacity, starting at [`BULK`].
#[derive(Debug)]
pub struct Journal {
    entries: Vec<Entry>,
}

/// Shared sentinel for buffers that never journal (zero-copy borrows).
pub(crate) static NO_JOURNAL: Journal = Journal {
    entries: Vec::new(),
};

impl Journal {
    pub(crate) fn new() -> Journal {
        Journal {
            entries: Vec::with_capacity(BULK),
        }
    }

    /// Number of entries — the current buffer version.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded entries, oldest first.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Record an edit. Entry fields are preserved verbatim for replay.
    pub(crate) fn log(&mut self, origin: usize, offset: usize, delta: isize) {
        debug_assert!(origin <= offset);
        debug_assert!(delta != 0);
        self.entries.push(Entry {
            origin,
            offset,
            delta,
        });
    }

    /// Drop the newest entry, if any — backs out a journaled edit whose
    /// follow-up work failed.
    pub fn revert(&mut self) {
        self.entries.pop();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Alignment
    // ─────────────────────────────────────────────────────────────────────

    /// Replay entries newer than `version` onto `offset`.
    ///
    /// Each entry lands in exactly one of four cases:
    ///
    /// 1. *Before the part* (`origin < start`, `offset < end`): the whole
    ///    part shifts by `delta`. Header diffs whose target byte lies
    ///    before the entry's shift point did not move, so they are
    ///    re-pinned by `-delta`.
    /// 2. *Within the part* (`origin >= header start`, `offset <= end`):
    ///    an edit inside the payload resizes the part; an edit that
    ///    removes exactly the header-to-end region collapses it and marks
    ///    it for invalidation.
    /// 3. *Covered by a clear* (`origin <= header start` and the entry is
    ///    a clear): the part's bytes are gone — collapse and mark.
    /// 4. Anything else: an ancestor resized around this part; no action.
    ///
    /// The walk always completes; invalidation is applied afterwards and
    /// is sticky. The boundary between cases 1 and 2 is the strict `<`
    /// on the entry origin: an entry starting exactly at `start` is "at
    /// or inside".
    pub(crate) fn align(&self, version: &mut Version, offset: &mut Offset) {
        let from = match *version {
            Version::Invalid => return,
            Version::Valid(v) => v,
        };
        let mut invalid = false;

        for entry in &self.entries[from.min(self.entries.len())..] {
            let e_origin = entry.origin as isize;
            let e_offset = entry.offset as isize;
            let start = offset.start as isize;
            let end = offset.end as isize;
            let header = start + offset.diff.origin;

            if e_origin < start && e_offset < end {
                // Case 1: shift. A diff target that did not move with the
                // suffix (its byte sits before the entry's shift point)
                // keeps its absolute position, so the relative distance
                // from the shifted start grows by -delta.
                let shifted = start + entry.delta;
                offset.start = shifted as usize;
                offset.end = (end + entry.delta) as usize;
                for diff in [
                    &mut offset.diff.origin,
                    &mut offset.diff.tag,
                    &mut offset.diff.length,
                ] {
                    let old_target = shifted + *diff - entry.delta;
                    if old_target < e_offset {
                        *diff -= entry.delta;
                    }
                }
            } else if e_origin >= header && e_offset <= end {
                if e_origin >= start {
                    // Case 2a: resize — the payload grew or shrank.
                    offset.end = (end + entry.delta) as usize;
                } else if header == end + entry.delta {
                    // Case 2b: the edit removed exactly header..end.
                    offset.start = header as usize;
                    offset.end = header as usize;
                    offset.diff = Diff::ZERO;
                    invalid = true;
                }
            } else if e_origin <= header && entry.is_clear() {
                // Case 3: an enclosing region was cleared.
                offset.start = entry.origin;
                offset.end = entry.origin;
                offset.diff = Diff::ZERO;
                invalid = true;
            }
            // Case 4: ancestor resize around this part — nothing to do.
        }

        *version = if invalid {
            Version::Invalid
        } else {
            Version::Valid(self.entries.len())
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part_at(start: usize, end: usize, diff: Diff) -> (Version, Offset) {
        (Version::Valid(0), Offset { start, end, diff })
    }

    fn header_diff(tag: isize, length: isize) -> Diff {
        Diff {
            origin: tag,
            tag,
            length,
        }
    }

    #[test]
    fn shift_before_part() {
        let mut journal = Journal::new();
        journal.log(0, 0, 2); // two bytes inserted at the front
        let (mut version, mut offset) = part_at(4, 6, header_diff(-1, -1));
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Valid(1));
        assert_eq!(offset.start, 6);
        assert_eq!(offset.end, 8);
        // Header shifted with the payload: diffs unchanged.
        assert_eq!(offset.diff, header_diff(-1, -1));
    }

    #[test]
    fn shift_repins_header_diffs() {
        // Length prefix [2,3) of a field with tag at 1 and payload [3,7)
        // grows by one byte; the payload shifts, the tag byte does not.
        let mut journal = Journal::new();
        journal.log(2, 3, 1);
        let (mut version, mut offset) = part_at(
            3,
            7,
            Diff {
                origin: -2,
                tag: -2,
                length: -1,
            },
        );
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Valid(1));
        assert_eq!(offset.start, 4);
        assert_eq!(offset.end, 8);
        // Tag still at absolute 1, prefix still begins at absolute 2.
        assert_eq!(offset.diff.origin, -3);
        assert_eq!(offset.diff.tag, -3);
        assert_eq!(offset.diff.length, -2);
    }

    #[test]
    fn resize_inside_part() {
        let mut journal = Journal::new();
        journal.log(4, 6, 3); // grow inside the payload
        let (mut version, mut offset) = part_at(2, 10, Diff::ZERO);
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Valid(1));
        assert_eq!(offset.start, 2);
        assert_eq!(offset.end, 13);
    }

    #[test]
    fn wholesale_clear_invalidates() {
        // Field header at 3, payload [5,9); clearing [3,9) removes it.
        let mut journal = Journal::new();
        journal.log(3, 9, -6);
        let (mut version, mut offset) = part_at(5, 9, header_diff(-2, -1));
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Invalid);
        assert_eq!(offset.start, 3);
        assert_eq!(offset.end, 3);
        assert_eq!(offset.diff, Diff::ZERO);
    }

    #[test]
    fn covering_clear_invalidates() {
        // Clear of [1,12) encloses the part at [5,9) with header at 3.
        let mut journal = Journal::new();
        journal.log(1, 12, -11);
        let (mut version, mut offset) = part_at(5, 9, header_diff(-2, -1));
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Invalid);
        assert_eq!(offset.start, 1);
        assert_eq!(offset.end, 1);
    }

    #[test]
    fn ancestor_resize_leaves_part_alone() {
        // A write spanning around the part (not a clear) — the enclosing
        // message was rewritten; this part's region is inside the new
        // bytes and keeps its offsets.
        let mut journal = Journal::new();
        journal.log(1, 12, 4);
        let (mut version, mut offset) = part_at(5, 9, header_diff(-2, -1));
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Valid(1));
        assert_eq!(offset.start, 5);
        assert_eq!(offset.end, 9);
    }

    #[test]
    fn invalidation_is_sticky() {
        let mut journal = Journal::new();
        journal.log(3, 9, -6);
        let (mut version, mut offset) = part_at(5, 9, header_diff(-2, -1));
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Invalid);

        journal.log(0, 0, 5);
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Invalid);
    }

    #[test]
    fn algebraic_sum_of_preceding_deltas() {
        let mut journal = Journal::new();
        journal.log(0, 0, 3);
        journal.log(1, 2, 5);
        journal.log(20, 24, -4); // after the part: no effect
        let (mut version, mut offset) = part_at(10, 14, Diff::ZERO);
        journal.align(&mut version, &mut offset);
        assert_eq!(version, Version::Valid(3));
        assert_eq!(offset.start, 18);
        assert_eq!(offset.end, 22);
    }

    #[test]
    fn revert_pops_newest() {
        let mut journal = Journal::new();
        journal.log(0, 1, 2);
        journal.log(4, 5, 1);
        journal.revert();
        assert_eq!(journal.len(), 1);
        assert_eq!(
            journal.entries(),
            &[Entry {
                origin: 0,
                offset: 1,
                delta: 2
            }]
        );
        journal.revert();
        journal.revert(); // empty: no-op
        assert!(journal.is_empty());
    }

    #[test]
    fn clear_entry_detection() {
        assert!(Entry {
            origin: 3,
            offset: 9,
            delta: -6
        }
        .is_clear());
        assert!(!Entry {
            origin: 3,
            offset: 9,
            delta: -2
        }
        .is_clear());
    }
}
