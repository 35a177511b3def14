//! Forward iteration over the fields of a message.
//!
//! A cursor walks a message's payload in buffer order, optionally
//! filtered to one tag. Unknown tags and wire-type mismatches are
//! skipped; packed runs are expanded value by value. The cursor's
//! position is itself a part, so it survives buffer mutations between
//! steps the same way every other anchor does — by realigning against
//! the journal.
//!
//! Cursor state machine for packed fields: `Scalar` between top-level
//! fields, `Run { remaining }` while stepping inside a packed payload.

use crate::buffer::Buffer;
use crate::descriptor::{FieldDescriptor, MessageDescriptor};
use crate::error::Error;
use crate::field::decode_payload;
use crate::message::Message;
use crate::part::{relength_lineage, Diff, Offset, Part, Version};
use crate::stream::Stream;
use crate::types::{split_key, Type, Value, WireType};
use crate::varint::{self, pack_staged};

#[derive(Debug, Clone, Copy)]
enum Packed {
    Scalar,
    Run { remaining: usize, run: Part },
}

/// Iterator over the fields of one message region.
#[derive(Debug, Clone)]
pub struct Cursor {
    descriptor: &'static MessageDescriptor,
    message: Part,
    lineage: Vec<Part>,
    filter: u32,
    current: Part,
    field: Option<&'static FieldDescriptor>,
    wire: WireType,
    packed: Packed,
    pos: usize,
    error: Option<Error>,
    /// Construction-time failure (invalid message, unknown filter tag);
    /// such a cursor can never be rewound into validity.
    birth: Option<Error>,
}

impl Cursor {
    // ─────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────

    /// Cursor over every field of `message`, positioned on the first one.
    pub fn over(message: &Message, buf: &Buffer<'_>) -> Cursor {
        Cursor::with_filter(message, buf, 0)
    }

    /// Cursor filtered to occurrences of `tag`, positioned on the first.
    pub fn find(message: &Message, buf: &Buffer<'_>, tag: u32) -> Cursor {
        Cursor::with_filter(message, buf, tag)
    }

    fn with_filter(message: &Message, buf: &Buffer<'_>, filter: u32) -> Cursor {
        let mut cursor = Cursor {
            descriptor: message.descriptor(),
            message: message.part(),
            lineage: message.child_lineage(),
            filter,
            current: Part::invalid(),
            field: None,
            wire: WireType::Varint,
            packed: Packed::Scalar,
            pos: 0,
            error: None,
            birth: None,
        };
        if filter != 0 && cursor.descriptor.field_by_tag(filter).is_none() {
            cursor.error = Some(Error::Descriptor);
            cursor.birth = cursor.error;
            return cursor;
        }
        if let Err(error) = cursor.message.align(buf) {
            cursor.error = Some(error);
            cursor.birth = cursor.error;
            return cursor;
        }
        let start = cursor.message.offset().start;
        cursor.current = resume_at(buf, start);
        cursor.advance(buf);
        cursor
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────

    /// The tag filter; 0 means every field is visited.
    pub fn tag(&self) -> u32 {
        self.filter
    }

    /// Zero-based index of the current field among those visited.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// The terminal or construction error, once the cursor has stopped.
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Descriptor of the field the cursor is positioned on.
    pub fn field_descriptor(&self) -> Option<&'static FieldDescriptor> {
        if self.is_valid() {
            self.field
        } else {
            None
        }
    }

    /// Wire type of the current field's value.
    pub fn wire_type(&self) -> Option<WireType> {
        if self.is_valid() && self.field.is_some() {
            Some(self.wire)
        } else {
            None
        }
    }

    /// Snapshot of the current position for part and field construction.
    pub fn current(&self) -> Result<Part, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.field.is_none() {
            return Err(Error::Invalid);
        }
        Ok(self.current)
    }

    /// Whether the cursor is positioned inside a packed run.
    pub fn in_packed_run(&self) -> bool {
        matches!(self.packed, Packed::Run { .. })
    }

    pub(crate) fn lineage(&self) -> &[Part] {
        &self.lineage
    }

    // ─────────────────────────────────────────────────────────────────────
    // Movement
    // ─────────────────────────────────────────────────────────────────────

    /// Advance to the next matching field. Returns `false` at the end of
    /// the message (`OFFSET`) or on malformed data (`VARINT`, `UNDERRUN`).
    pub fn next(&mut self, buf: &Buffer<'_>) -> bool {
        if self.advance(buf) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Reset to the initial position and re-run the first advance.
    /// A cursor that failed at construction stays failed.
    pub fn rewind(&mut self, buf: &Buffer<'_>) -> bool {
        if let Some(error) = self.birth {
            self.error = Some(error);
            return false;
        }
        self.error = None;
        self.packed = Packed::Scalar;
        self.field = None;
        self.pos = 0;
        if let Err(error) = self.message.align(buf) {
            self.error = Some(error);
            return false;
        }
        self.current = resume_at(buf, self.message.offset().start);
        self.advance(buf)
    }

    /// Advance until the current value equals `value`. Returns `false`
    /// when the cursor ends first.
    pub fn seek(&mut self, buf: &Buffer<'_>, value: &Value<'_>) -> bool {
        while self.next(buf) {
            if matches!(self.matches(buf, value), Ok(true)) {
                return true;
            }
        }
        false
    }

    /// One positioning step; `pos` is maintained by the callers.
    fn advance(&mut self, buf: &Buffer<'_>) -> bool {
        if self.error.is_some() {
            return false;
        }
        if let Err(error) = self.message.align(buf) {
            self.error = Some(error);
            return false;
        }
        if let Packed::Run { remaining, run } = self.packed {
            if remaining > 0 {
                return self.step_packed(buf, remaining, run);
            }
            // Run exhausted: the current value's end is the run's end;
            // fall through and scan the next top-level field.
            self.packed = Packed::Scalar;
        }
        self.scan(buf)
    }

    /// Scan top-level fields from the current position until one matches
    /// the filter and the schema, entering packed runs on the way.
    fn scan(&mut self, buf: &Buffer<'_>) -> bool {
        loop {
            if self.current.align(buf).is_err() {
                // The field under the cursor was erased by another
                // anchor; its offsets collapsed to the deletion point,
                // which is where scanning resumes.
                self.current = resume_at(buf, self.current.offset().start);
            }
            let at = self.current.offset().end;
            let end = self.message.offset().end;
            if at >= end {
                self.error = Some(Error::Offset);
                return false;
            }

            let mut stream = Stream::over(&buf.data()[..end], at);
            let key = match stream.read_varint() {
                Ok(key) => key,
                Err(error) => {
                    self.error = Some(error);
                    return false;
                }
            };
            if key > u64::from(u32::MAX) {
                self.error = Some(Error::Varint);
                return false;
            }
            let (tag, bits) = split_key(key as u32);
            let wire = match WireType::from_tag_bits(bits) {
                Some(wire) => wire,
                None => {
                    self.error = Some(Error::Varint);
                    return false;
                }
            };
            let tag_end = stream.offset();

            let field = self.descriptor.field_by_tag(tag);
            let packed_run = field.is_some_and(|f| f.is_packed()) && wire == WireType::Length;
            let matched = match field {
                None => false,
                Some(f) => {
                    (wire == f.wire_type() || packed_run)
                        && (self.filter == 0 || tag == self.filter)
                }
            };

            if !matched {
                if let Err(error) = stream.skip(wire) {
                    self.error = Some(wire_error(error));
                    return false;
                }
                self.current = resume_at(buf, stream.offset());
                continue;
            }
            let field = field.expect("matched field has a descriptor");

            if packed_run {
                let len = match stream.read_varint() {
                    Ok(len) => len as usize,
                    Err(error) => {
                        self.error = Some(error);
                        return false;
                    }
                };
                let run_start = stream.offset();
                if run_start + len > end {
                    self.error = Some(Error::Underrun);
                    return false;
                }
                let count = match count_packed(
                    field.typ,
                    &buf.data()[run_start..run_start + len],
                ) {
                    Ok(count) => count,
                    Err(error) => {
                        self.error = Some(error);
                        return false;
                    }
                };
                if count == 0 {
                    // Empty run: nothing to visit, keep scanning past it.
                    self.current = resume_at(buf, run_start + len);
                    continue;
                }
                let run = Part::from_raw(
                    Version::Valid(buf.version()),
                    Offset {
                        start: run_start,
                        end: run_start + len,
                        diff: Diff {
                            origin: at as isize - run_start as isize,
                            tag: at as isize - run_start as isize,
                            length: tag_end as isize - run_start as isize,
                        },
                    },
                );
                self.field = Some(field);
                self.wire = field.wire_type();
                self.current = resume_at(buf, run_start);
                return self.step_packed(buf, count, run);
            }

            // Plain field: compute the payload extent by wire type.
            let value_start = stream.offset();
            let (payload_start, payload_end, length_diff) = match wire {
                WireType::Varint => {
                    if let Err(error) = stream.skip(WireType::Varint) {
                        self.error = Some(wire_error(error));
                        return false;
                    }
                    (value_start, stream.offset(), None)
                }
                WireType::Bit32 | WireType::Bit64 => {
                    let width = if wire == WireType::Bit32 { 4 } else { 8 };
                    if let Err(error) = stream.advance(width) {
                        self.error = Some(wire_error(error));
                        return false;
                    }
                    (value_start, value_start + width, None)
                }
                WireType::Length => {
                    let len = match stream.read_varint() {
                        Ok(len) => len as usize,
                        Err(error) => {
                            self.error = Some(error);
                            return false;
                        }
                    };
                    let payload_start = stream.offset();
                    if payload_start + len > end {
                        self.error = Some(Error::Underrun);
                        return false;
                    }
                    (payload_start, payload_start + len, Some(tag_end))
                }
            };

            self.field = Some(field);
            self.wire = wire;
            self.current = Part::from_raw(
                Version::Valid(buf.version()),
                Offset {
                    start: payload_start,
                    end: payload_end,
                    diff: Diff {
                        origin: at as isize - payload_start as isize,
                        tag: at as isize - payload_start as isize,
                        length: match length_diff {
                            Some(prefix) => prefix as isize - payload_start as isize,
                            None => at as isize - payload_start as isize,
                        },
                    },
                },
            );
            return true;
        }
    }

    /// Position on the next value inside the active packed run.
    fn step_packed(&mut self, buf: &Buffer<'_>, remaining: usize, mut run: Part) -> bool {
        debug_assert!(remaining > 0);
        if run.align(buf).is_err() {
            // The run was deleted underneath us; resume the top-level
            // scan from the collapse point.
            self.packed = Packed::Scalar;
            self.current = resume_at(buf, run.offset().start);
            return self.scan(buf);
        }
        if self.current.align(buf).is_err() {
            self.current = resume_at(buf, self.current.offset().start);
        }
        let at = self.current.offset().end;
        let run_end = run.offset().end;
        if at >= run_end {
            // The run shrank underneath the remaining count.
            self.error = Some(Error::Underrun);
            return false;
        }
        let typ = self.field.expect("packed run has a descriptor").typ;

        let width = match typ.wire_type() {
            WireType::Varint => match varint::unpack64(&buf.data()[at..run_end]) {
                Some((_, used)) => used,
                None => {
                    self.error = Some(Error::Varint);
                    return false;
                }
            },
            WireType::Bit32 => 4,
            WireType::Bit64 => 8,
            WireType::Length => unreachable!("length values cannot be packed"),
        };
        if at + width > run_end {
            self.error = Some(Error::Underrun);
            return false;
        }
        self.current = Part::from_raw(
            Version::Valid(buf.version()),
            Offset {
                start: at,
                end: at + width,
                diff: Diff::ZERO,
            },
        );
        self.packed = Packed::Run {
            remaining: remaining - 1,
            run,
        };
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Value operations at the current position
    // ─────────────────────────────────────────────────────────────────────

    /// Decode the current value.
    pub fn get<'b>(&mut self, buf: &'b Buffer<'_>) -> Result<Value<'b>, Error> {
        let field = self.require_position()?;
        self.current.align(buf)?;
        let o = self.current.offset();
        decode_payload(field.typ, &buf.data()[o.start..o.end])
    }

    /// Byte-compare the current value against `value`.
    pub fn matches(&mut self, buf: &Buffer<'_>, value: &Value<'_>) -> Result<bool, Error> {
        let field = self.require_position()?;
        if value.schema_type() != field.typ {
            return Err(Error::Descriptor);
        }
        self.current.align(buf)?;
        let o = self.current.offset();
        let payload = &buf.data()[o.start..o.end];
        if field.typ.is_length_delimited() {
            Ok(payload == value.payload().unwrap_or(&[]))
        } else {
            let (staging, n) = pack_staged(field.typ, value)?;
            Ok(payload == &staging[..n])
        }
    }

    /// Overwrite the current value. The cursor stays on the value; its
    /// position does not move.
    pub fn put(&mut self, buf: &mut Buffer<'_>, value: &Value<'_>) -> Result<(), Error> {
        let field = self.require_position()?;
        if value.schema_type() != field.typ {
            return Err(Error::Descriptor);
        }
        let before = buf.version();
        let mut part = self.current;
        if field.typ.is_length_delimited() {
            let payload = value.payload().ok_or(Error::Descriptor)?;
            part.write(buf, payload)?;
        } else {
            let (staging, n) = pack_staged(field.typ, value)?;
            part.write(buf, &staging[..n])?;
        }
        self.current = part;
        if buf.version() != before {
            self.fix_prefixes(buf)?;
        }
        Ok(())
    }

    /// Delete the current occurrence — header and payload for a plain
    /// field, the value bytes for a packed element (the run's length
    /// prefix is re-emitted). Erasing the sole value of a run removes
    /// the run's header as well.
    pub fn erase(&mut self, buf: &mut Buffer<'_>) -> Result<(), Error> {
        self.require_position()?;
        self.current.align(buf)?;

        if let Packed::Run { remaining, mut run } = self.packed {
            run.align(buf)?;
            let o = self.current.offset();
            let r = run.offset();
            if o.start == r.start && o.end == r.end {
                // Sole value: drop the whole run, header included.
                run.clear(buf)?;
                self.current = resume_at(buf, run.offset().start);
                self.packed = Packed::Scalar;
                self.field = None;
            } else {
                let mut part = self.current;
                part.clear(buf)?;
                self.current = resume_at(buf, o.start);
                self.packed = Packed::Run { remaining, run };
            }
            return self.fix_prefixes(buf);
        }

        let mut part = self.current;
        part.clear(buf)?;
        self.current = resume_at(buf, part.offset().start);
        self.field = None;
        self.fix_prefixes(buf)
    }

    /// Borrow the current fixed-width payload mutably.
    pub fn raw<'b>(&mut self, buf: &'b mut Buffer<'_>) -> Result<&'b mut [u8], Error> {
        let field = self.require_position()?;
        match field.wire_type() {
            WireType::Bit32 | WireType::Bit64 => {}
            _ => return Err(Error::Descriptor),
        }
        self.current.align(buf)?;
        let o = self.current.offset();
        Ok(&mut buf.data_mut()[o.start..o.end])
    }

    /// Realign the cursor's anchors against the journal.
    ///
    /// When the current position itself was invalidated by another
    /// anchor's mutation, the walk restarts from the message payload
    /// start, re-parsing onto the first matching field.
    pub fn align(&mut self, buf: &Buffer<'_>) -> Result<(), Error> {
        self.message.align(buf)?;
        let run_gone = match self.packed {
            Packed::Run { mut run, remaining } => {
                if run.align(buf).is_err() {
                    true
                } else {
                    self.packed = Packed::Run { remaining, run };
                    false
                }
            }
            Packed::Scalar => false,
        };
        if run_gone || self.current.align(buf).is_err() {
            self.packed = Packed::Scalar;
            self.error = None;
            self.field = None;
            self.pos = 0;
            self.current = resume_at(buf, self.message.offset().start);
            self.advance(buf);
        }
        Ok(())
    }

    fn require_position(&self) -> Result<&'static FieldDescriptor, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.field.ok_or(Error::Invalid)
    }

    /// Re-emit the length prefixes around the current position after a
    /// size change: the packed run's own prefix first, then the lineage
    /// from the innermost enclosing message outwards.
    fn fix_prefixes(&mut self, buf: &mut Buffer<'_>) -> Result<(), Error> {
        if let Packed::Run { remaining, mut run } = self.packed {
            if run.is_valid() {
                run.relength(buf)?;
                self.packed = Packed::Run { remaining, run };
            }
        }
        relength_lineage(&mut self.lineage, buf)
    }
}

/// An empty, valid anchor at `at` — the position scanning resumes from.
fn resume_at(buf: &Buffer<'_>, at: usize) -> Part {
    Part::from_raw(
        Version::Valid(buf.version()),
        Offset {
            start: at,
            end: at,
            diff: Diff::ZERO,
        },
    )
}

/// Truncated-value errors inside a message walk surface as `UNDERRUN`.
fn wire_error(error: Error) -> Error {
    match error {
        Error::Offset => Error::Underrun,
        other => other,
    }
}

/// Number of values concatenated in a packed payload.
fn count_packed(typ: Type, payload: &[u8]) -> Result<usize, Error> {
    match typ.wire_type() {
        WireType::Varint => {
            let mut count = 0;
            let mut rest = payload;
            while !rest.is_empty() {
                match varint::unpack64(rest) {
                    Some((_, used)) => {
                        count += 1;
                        rest = &rest[used..];
                    }
                    None => return Err(Error::Varint),
                }
            }
            Ok(count)
        }
        WireType::Bit32 | WireType::Bit64 => {
            let width = if typ.wire_type() == WireType::Bit32 { 4 } else { 8 };
            if payload.len() % width != 0 {
                return Err(Error::Underrun);
            }
            Ok(payload.len() / width)
        }
        WireType::Length => Err(Error::Descriptor),
    }
}
