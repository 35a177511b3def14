//! Versioned anchors over buffer regions.
//!
//! A part names a slice of the buffer — the payload `[start, end)` plus
//! relative distances back to its header bytes — together with the
//! journal version at which those offsets were last known to be true.
//! Anything observing a part first replays the journal entries it has
//! not seen (see [`Journal::align`](crate::journal::Journal)); a part
//! whose region was destroyed comes out of that replay invalid, and
//! invalidity is sticky.
//!
//! Fields, messages, and cursors are all parts with extra semantics.

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::error::Error;
use crate::message::Message;
use crate::types::{tag_key, WireType};
use crate::varint::{pack64, MAX_VARINT_BYTES};

// ─────────────────────────────────────────────────────────────────────────────
// Offsets
// ─────────────────────────────────────────────────────────────────────────────

/// Relative distances (≤ 0) from a part's payload start back to its
/// header bytes.
///
/// `origin` points at the first header byte, `tag` at the tag varint,
/// and `length` at the length prefix. A part without a length prefix has
/// `length == tag`; the root part of a buffer has all three at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diff {
    pub origin: isize,
    pub tag: isize,
    pub length: isize,
}

impl Diff {
    pub const ZERO: Diff = Diff {
        origin: 0,
        tag: 0,
        length: 0,
    };
}

/// Absolute payload span plus header distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub start: usize,
    pub end: usize,
    pub diff: Diff,
}

impl Offset {
    /// Whether this part carries a varint length prefix.
    #[inline]
    pub fn has_prefix(&self) -> bool {
        self.diff.length != self.diff.tag
    }

    /// Absolute position of the first header byte.
    #[inline]
    pub fn origin(&self) -> usize {
        (self.start as isize + self.diff.origin) as usize
    }
}

/// A part's journal position: the version it last replayed to, or the
/// sticky invalid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Valid(usize),
    Invalid,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parts
// ─────────────────────────────────────────────────────────────────────────────

/// A versioned region anchor. Copyable; copies realign independently.
#[derive(Debug, Clone, Copy)]
pub struct Part {
    version: Version,
    offset: Offset,
}

impl Part {
    /// Wrap the whole buffer as the root part (no header, spans all
    /// bytes). An invalid buffer yields an invalid part.
    pub fn from_binary(buf: &Buffer<'_>) -> Part {
        if !buf.is_valid() {
            return Part::invalid();
        }
        Part {
            version: Version::Valid(buf.version()),
            offset: Offset {
                start: 0,
                end: buf.len(),
                diff: Diff::ZERO,
            },
        }
    }

    /// Snapshot the cursor's current position into a new part.
    pub fn from_cursor(cursor: &Cursor) -> Result<Part, Error> {
        cursor.current()
    }

    /// Locate the field `tag` inside `message`, or create it empty at the
    /// message's end (tag header, and a zero length prefix for
    /// length-delimited fields).
    ///
    /// The caller re-emits ancestor length prefixes after a creation; this
    /// constructor only appends the header bytes.
    pub(crate) fn create(
        message: &Message,
        buf: &mut Buffer<'_>,
        tag: u32,
    ) -> Result<Part, Error> {
        let descriptor = message
            .descriptor()
            .field_by_tag(tag)
            .ok_or(Error::Descriptor)?;

        let cursor = Cursor::find(message, buf, tag);
        if cursor.is_valid() {
            // Packed values have no per-value header; they are edited
            // through the cursor, not through a free-standing part.
            if cursor.in_packed_run() {
                return Err(Error::Descriptor);
            }
            return cursor.current();
        }
        match cursor.error() {
            Some(Error::Offset) => {} // absent: fall through and create
            Some(error) => return Err(error),
            None => unreachable!("cursor is valid"),
        }

        let mut anchor = message.part();
        anchor.align(buf)?;
        let at = anchor.offset.end;

        let mut header = [0u8; MAX_VARINT_BYTES + 1];
        let mut header_len = pack64(&mut header, u64::from(tag_key(tag, descriptor.wire_type())));
        let prefixed = descriptor.wire_type() == WireType::Length;
        if prefixed {
            header[header_len] = 0x00;
            header_len += 1;
        }
        buf.write(at, at, &header[..header_len])?;

        let start = at + header_len;
        Ok(Part {
            version: Version::Valid(buf.version()),
            offset: Offset {
                start,
                end: start,
                diff: Diff {
                    origin: -(header_len as isize),
                    tag: -(header_len as isize),
                    length: if prefixed { -1 } else { -(header_len as isize) },
                },
            },
        })
    }

    /// The always-invalid part.
    pub fn invalid() -> Part {
        Part {
            version: Version::Invalid,
            offset: Offset {
                start: 0,
                end: 0,
                diff: Diff::ZERO,
            },
        }
    }

    pub(crate) fn from_raw(version: Version, offset: Offset) -> Part {
        Part { version, offset }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────

    pub fn is_valid(&self) -> bool {
        self.version != Version::Invalid
    }

    pub fn error(&self) -> Option<Error> {
        match self.version {
            Version::Invalid => Some(Error::Invalid),
            Version::Valid(_) => None,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Raw offsets as last aligned. Call [`align`](Part::align) first if
    /// the buffer may have changed underneath.
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Payload start, aligned.
    pub fn start(&mut self, buf: &Buffer<'_>) -> Result<usize, Error> {
        self.align(buf)?;
        Ok(self.offset.start)
    }

    /// Payload end, aligned.
    pub fn end(&mut self, buf: &Buffer<'_>) -> Result<usize, Error> {
        self.align(buf)?;
        Ok(self.offset.end)
    }

    /// Payload size in bytes, aligned.
    pub fn size(&mut self, buf: &Buffer<'_>) -> Result<usize, Error> {
        self.align(buf)?;
        Ok(self.offset.end - self.offset.start)
    }

    /// Replay journal entries recorded since this part last looked.
    pub fn align(&mut self, buf: &Buffer<'_>) -> Result<(), Error> {
        match self.version {
            Version::Invalid => Err(Error::Invalid),
            Version::Valid(v) if v == buf.version() => Ok(()),
            Version::Valid(_) => {
                buf.journal().align(&mut self.version, &mut self.offset);
                if self.version == Version::Invalid {
                    Err(Error::Invalid)
                } else {
                    Ok(())
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the payload with `data`.
    ///
    /// For length-prefixed parts the prefix is re-encoded in the same
    /// splice; its size change and the payload's are journaled as two
    /// entries so that replaying parts can tell the header shift from
    /// the payload resize.
    pub fn write(&mut self, buf: &mut Buffer<'_>, data: &[u8]) -> Result<(), Error> {
        self.align(buf)?;
        let o = self.offset;
        if o.has_prefix() {
            let prefix_pos = (o.start as isize + o.diff.length) as usize;
            let mut prefix = [0u8; MAX_VARINT_BYTES];
            let prefix_len = pack64(&mut prefix, data.len() as u64);
            buf.write_parts(prefix_pos, o.start, o.end, &prefix[..prefix_len], data)?;

            let shift = prefix_len as isize - (o.start - prefix_pos) as isize;
            let start = (o.start as isize + shift) as usize;
            self.offset = Offset {
                start,
                end: start + data.len(),
                diff: Diff {
                    origin: o.diff.origin - shift,
                    tag: o.diff.tag - shift,
                    length: -(prefix_len as isize),
                },
            };
        } else {
            buf.write(o.start, o.end, data)?;
            self.offset.end = o.start + data.len();
        }
        self.version = Version::Valid(buf.version());
        Ok(())
    }

    /// Delete the part — header and payload — and leave it invalid.
    pub fn clear(&mut self, buf: &mut Buffer<'_>) -> Result<(), Error> {
        self.align(buf)?;
        let o = self.offset;
        let origin = o.origin();
        buf.clear(origin, o.end)?;
        self.offset = Offset {
            start: origin,
            end: origin,
            diff: Diff::ZERO,
        };
        self.version = Version::Invalid;
        Ok(())
    }

    /// Re-encode this part's length prefix from its current payload size.
    ///
    /// No-op for unprefixed parts and when the encoded bytes already
    /// match. The part's own offsets are left to the next align: the
    /// prefix entry (if any) replays onto them like any other edit.
    pub(crate) fn relength(&mut self, buf: &mut Buffer<'_>) -> Result<(), Error> {
        self.align(buf)?;
        let o = self.offset;
        if !o.has_prefix() {
            return Ok(());
        }
        let prefix_pos = (o.start as isize + o.diff.length) as usize;
        let mut prefix = [0u8; MAX_VARINT_BYTES];
        let prefix_len = pack64(&mut prefix, (o.end - o.start) as u64);
        if buf.data()[prefix_pos..o.start] == prefix[..prefix_len] {
            return Ok(());
        }
        buf.write(prefix_pos, o.start, &prefix[..prefix_len])
    }
}

/// Re-emit the length prefix of every part in `lineage`, innermost
/// first, so outer prefixes see the inner growth when they realign.
/// Lineages are ordered outermost-first.
pub(crate) fn relength_lineage(lineage: &mut [Part], buf: &mut Buffer<'_>) -> Result<(), Error> {
    for part in lineage.iter_mut().rev() {
        part.relength(buf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_part_spans_buffer() {
        let buf = Buffer::copy_from(&[0x08, 0x7F, 0x10, 0x01]);
        let mut root = Part::from_binary(&buf);
        assert!(root.is_valid());
        assert_eq!(root.start(&buf).unwrap(), 0);
        assert_eq!(root.end(&buf).unwrap(), 4);
        assert_eq!(root.offset().diff, Diff::ZERO);
    }

    #[test]
    fn invalid_buffer_yields_invalid_part() {
        let buf = Buffer::invalid();
        let mut part = Part::from_binary(&buf);
        assert!(!part.is_valid());
        assert_eq!(part.error(), Some(Error::Invalid));
        assert_eq!(part.align(&buf), Err(Error::Invalid));
    }

    #[test]
    fn unprefixed_write_resizes_payload() {
        // Field 1 = 127 → 128: one byte becomes two, journaled (1, 2, +1).
        let mut buf = Buffer::copy_from(&[0x08, 0x7F]);
        let mut part = Part::from_raw(
            Version::Valid(0),
            Offset {
                start: 1,
                end: 2,
                diff: Diff {
                    origin: -1,
                    tag: -1,
                    length: -1,
                },
            },
        );
        part.write(&mut buf, &[0x80, 0x01]).unwrap();
        assert_eq!(buf.data(), &[0x08, 0x80, 0x01]);
        assert_eq!(part.offset().start, 1);
        assert_eq!(part.offset().end, 3);
        assert_eq!(buf.journal().entries().len(), 1);
    }

    #[test]
    fn prefixed_write_reencodes_prefix() {
        // Field 8, string "ab" → 130-byte payload: prefix 0x02 grows to
        // [0x82, 0x01], journaled separately from the payload growth.
        let mut buf = Buffer::copy_from(&[0x42, 0x02, b'a', b'b']);
        let mut part = Part::from_raw(
            Version::Valid(0),
            Offset {
                start: 2,
                end: 4,
                diff: Diff {
                    origin: -2,
                    tag: -2,
                    length: -1,
                },
            },
        );
        let payload = [b'x'; 130];
        part.write(&mut buf, &payload).unwrap();
        assert_eq!(buf.len(), 1 + 2 + 130);
        assert_eq!(&buf.data()[..3], &[0x42, 0x82, 0x01]);
        assert_eq!(part.offset().start, 3);
        assert_eq!(part.offset().end, 133);
        assert_eq!(part.offset().diff.tag, -3);
        assert_eq!(part.offset().diff.length, -2);
        assert_eq!(buf.journal().entries().len(), 2);

        // Shrink back: prefix returns to one byte.
        part.write(&mut buf, b"yz").unwrap();
        assert_eq!(buf.data(), &[0x42, 0x02, b'y', b'z']);
        assert_eq!(part.offset().start, 2);
        assert_eq!(part.offset().end, 4);
    }

    #[test]
    fn same_size_write_changes_no_version() {
        let mut buf = Buffer::copy_from(&[0x08, 0x10]);
        let mut part = Part::from_raw(
            Version::Valid(0),
            Offset {
                start: 1,
                end: 2,
                diff: Diff {
                    origin: -1,
                    tag: -1,
                    length: -1,
                },
            },
        );
        part.write(&mut buf, &[0x20]).unwrap();
        assert_eq!(buf.data(), &[0x08, 0x20]);
        assert_eq!(buf.version(), 0);
    }

    #[test]
    fn clear_removes_header_and_payload() {
        let mut buf = Buffer::copy_from(&[0x08, 0x01, 0x10, 0x02]);
        let mut part = Part::from_raw(
            Version::Valid(0),
            Offset {
                start: 1,
                end: 2,
                diff: Diff {
                    origin: -1,
                    tag: -1,
                    length: -1,
                },
            },
        );
        part.clear(&mut buf).unwrap();
        assert_eq!(buf.data(), &[0x10, 0x02]);
        assert!(!part.is_valid());
        // Sticky: clearing again fails, bytes untouched.
        assert_eq!(part.clear(&mut buf), Err(Error::Invalid));
        assert_eq!(buf.data(), &[0x10, 0x02]);
    }

    #[test]
    fn sibling_parts_shift_across_writes() {
        // Two varint fields; growing the first shifts the second.
        let mut buf = Buffer::copy_from(&[0x08, 0x7F, 0x10, 0x01]);
        let mut first = Part::from_raw(
            Version::Valid(0),
            Offset {
                start: 1,
                end: 2,
                diff: Diff {
                    origin: -1,
                    tag: -1,
                    length: -1,
                },
            },
        );
        let mut second = Part::from_raw(
            Version::Valid(0),
            Offset {
                start: 3,
                end: 4,
                diff: Diff {
                    origin: -1,
                    tag: -1,
                    length: -1,
                },
            },
        );
        first.write(&mut buf, &[0x80, 0x01]).unwrap();
        second.align(&buf).unwrap();
        assert_eq!(second.offset().start, 4);
        assert_eq!(second.offset().end, 5);
        assert_eq!(buf.data()[4], 0x01);
    }

    #[test]
    fn relength_rewrites_stale_prefix() {
        // A sub-message region [2,4) whose prefix still says 2 after its
        // payload grew to 4 bytes via a direct buffer edit.
        let mut buf = Buffer::copy_from(&[0x62, 0x02, 0x08, 0x01]);
        let mut part = Part::from_raw(
            Version::Valid(0),
            Offset {
                start: 2,
                end: 4,
                diff: Diff {
                    origin: -2,
                    tag: -2,
                    length: -1,
                },
            },
        );
        buf.write(4, 4, &[0x10, 0x05]).unwrap();
        part.relength(&mut buf).unwrap();
        assert_eq!(buf.data(), &[0x62, 0x04, 0x08, 0x01, 0x10, 0x05]);
    }
}
