//! Typed field accessors.
//!
//! A field binds a part to its descriptor and moves values across the
//! wire boundary: reads decode the payload per the schema type, writes
//! encode through a fixed stack staging area (scalars) or straight from
//! the caller's slice (length-delimited).
//!
//! A field created for an absent tag whose descriptor declares a default
//! is *synthetic*: it answers reads with the default and touches the
//! buffer only on the first write.

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::descriptor::FieldDescriptor;
use crate::error::Error;
use crate::message::Message;
use crate::part::{relength_lineage, Diff, Offset, Part, Version};
use crate::types::{tag_key, Type, Value, WireType};
use crate::varint::{self, pack64, pack_staged, MAX_VARINT_BYTES};

/// Accessor for one field occurrence inside a message.
#[derive(Debug, Clone)]
pub struct Field {
    descriptor: &'static FieldDescriptor,
    part: Part,
    lineage: Vec<Part>,
    /// Schema default standing in for an absent field; cleared once the
    /// field is materialized by a write.
    default: Option<Value<'static>>,
}

impl Field {
    // ─────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────

    /// Locate the field `tag` inside `message`.
    ///
    /// Absent fields with a schema default become synthetic; absent
    /// fields without one are created empty in the buffer right away.
    pub fn create(message: &Message, buf: &mut Buffer<'_>, tag: u32) -> Result<Field, Error> {
        Field::create_internal(message, buf, tag, true)
    }

    /// Like [`create`](Field::create), but never materializes a schema
    /// default: an absent field is created empty.
    pub fn create_without_default(
        message: &Message,
        buf: &mut Buffer<'_>,
        tag: u32,
    ) -> Result<Field, Error> {
        Field::create_internal(message, buf, tag, false)
    }

    fn create_internal(
        message: &Message,
        buf: &mut Buffer<'_>,
        tag: u32,
        with_default: bool,
    ) -> Result<Field, Error> {
        let descriptor = message
            .descriptor()
            .field_by_tag(tag)
            .ok_or(Error::Descriptor)?;

        let cursor = Cursor::find(message, buf, tag);
        if cursor.is_valid() {
            if cursor.in_packed_run() {
                // Packed values are edited through the cursor.
                return Err(Error::Descriptor);
            }
            return Ok(Field {
                descriptor,
                part: cursor.current()?,
                lineage: message.child_lineage(),
                default: None,
            });
        }
        match cursor.error() {
            Some(Error::Offset) => {}
            Some(error) => return Err(error),
            None => unreachable!("invalid cursor carries an error"),
        }

        if with_default {
            if let Some(default) = descriptor.default() {
                // Synthetic: anchor an empty span at the message's end;
                // nothing is written until the first put.
                let mut anchor = message.part();
                anchor.align(buf)?;
                let at = anchor.offset().end;
                return Ok(Field {
                    descriptor,
                    part: Part::from_raw(
                        Version::Valid(buf.version()),
                        Offset {
                            start: at,
                            end: at,
                            diff: Diff::ZERO,
                        },
                    ),
                    lineage: message.child_lineage(),
                    default: Some(default),
                });
            }
        }

        let part = Part::create(message, buf, tag)?;
        let mut lineage = message.child_lineage();
        relength_lineage(&mut lineage, buf)?;
        Ok(Field {
            descriptor,
            part,
            lineage,
            default: None,
        })
    }

    /// Descend through `tags`, creating singular intermediate messages
    /// as needed, and bind the terminal field.
    ///
    /// Intermediates appended before a failing step are retained; there
    /// is no rollback.
    pub fn create_nested(
        message: &Message,
        buf: &mut Buffer<'_>,
        tags: &[u32],
    ) -> Result<Field, Error> {
        let (&last, inner) = tags.split_last().ok_or(Error::Descriptor)?;
        if inner.is_empty() {
            return Field::create(message, buf, last);
        }
        let leaf = message.create_nested(buf, inner)?;
        Field::create(&leaf, buf, last)
    }

    /// Snapshot the cursor's position as a field accessor.
    ///
    /// Fails with `DESCRIPTOR` when the cursor's wire type does not match
    /// the descriptor's, or when the cursor sits inside a packed run
    /// (packed values are operated on through the cursor itself).
    pub fn from_cursor(cursor: &Cursor) -> Result<Field, Error> {
        let descriptor = cursor.field_descriptor().ok_or(Error::Invalid)?;
        if cursor.in_packed_run() || cursor.wire_type() != Some(descriptor.wire_type()) {
            return Err(Error::Descriptor);
        }
        Ok(Field {
            descriptor,
            part: cursor.current()?,
            lineage: cursor.lineage().to_vec(),
            default: None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────

    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.descriptor
    }

    pub fn tag(&self) -> u32 {
        self.descriptor.tag
    }

    /// Copy of the underlying part anchor.
    pub fn part(&self) -> Part {
        self.part
    }

    /// Whether this field stands in for an absent occurrence via its
    /// schema default.
    pub fn is_synthetic(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.part.is_valid()
    }

    pub fn error(&self) -> Option<Error> {
        self.part.error()
    }

    /// Decode the field's value.
    pub fn get<'b>(&self, buf: &'b Buffer<'_>) -> Result<Value<'b>, Error> {
        if let Some(default) = self.default {
            return Ok(default);
        }
        let mut part = self.part;
        part.align(buf)?;
        let o = part.offset();
        decode_payload(self.descriptor.typ, &buf.data()[o.start..o.end])
    }

    /// Encode `value` the way [`put`](Field::put) would and byte-compare
    /// it against the current payload (or the default, when synthetic).
    pub fn matches(&self, buf: &Buffer<'_>, value: &Value<'_>) -> Result<bool, Error> {
        if value.schema_type() != self.descriptor.typ {
            return Err(Error::Descriptor);
        }
        if let Some(default) = &self.default {
            return payloads_equal(self.descriptor.typ, value, default);
        }
        let mut part = self.part;
        part.align(buf)?;
        let o = part.offset();
        let payload = &buf.data()[o.start..o.end];
        if self.descriptor.typ.is_length_delimited() {
            Ok(payload == value.payload().unwrap_or(&[]))
        } else {
            let (staging, n) = pack_staged(self.descriptor.typ, value)?;
            Ok(payload == &staging[..n])
        }
    }

    /// Borrow the payload bytes mutably.
    ///
    /// Only fixed-width (32/64-bit) fields expose their bytes: their size
    /// cannot change, so in-place edits need no re-encoding. The borrow
    /// ends before any other buffer operation can run.
    pub fn raw<'b>(&mut self, buf: &'b mut Buffer<'_>) -> Result<&'b mut [u8], Error> {
        match self.descriptor.wire_type() {
            WireType::Bit32 | WireType::Bit64 => {}
            _ => return Err(Error::Descriptor),
        }
        if self.default.is_some() {
            return Err(Error::Absent);
        }
        self.part.align(buf)?;
        let o = self.part.offset();
        Ok(&mut buf.data_mut()[o.start..o.end])
    }

    /// Realign against the buffer's journal.
    pub fn align(&mut self, buf: &Buffer<'_>) -> Result<(), Error> {
        self.part.align(buf)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Encode `value` into the field, materializing a synthetic field on
    /// first write. Every enclosing length prefix is re-emitted when the
    /// size changes.
    pub fn put(&mut self, buf: &mut Buffer<'_>, value: &Value<'_>) -> Result<(), Error> {
        if value.schema_type() != self.descriptor.typ {
            return Err(Error::Descriptor);
        }
        if self.default.is_some() {
            return self.materialize(buf, value);
        }
        let before = buf.version();
        if self.descriptor.typ.is_length_delimited() {
            let payload = value.payload().ok_or(Error::Descriptor)?;
            self.part.write(buf, payload)?;
        } else {
            let (staging, n) = pack_staged(self.descriptor.typ, value)?;
            self.part.write(buf, &staging[..n])?;
        }
        if buf.version() != before {
            relength_lineage(&mut self.lineage, buf)?;
        }
        Ok(())
    }

    /// First write to a synthetic field: emit header and payload at the
    /// anchored position in one splice.
    fn materialize(&mut self, buf: &mut Buffer<'_>, value: &Value<'_>) -> Result<(), Error> {
        self.part.align(buf)?;
        let at = self.part.offset().start;

        let mut staging = [0u8; varint::STAGING_BYTES];
        let payload: &[u8] = if self.descriptor.typ.is_length_delimited() {
            value.payload().ok_or(Error::Descriptor)?
        } else {
            let (bytes, n) = pack_staged(self.descriptor.typ, value)?;
            staging[..n].copy_from_slice(&bytes[..n]);
            &staging[..n]
        };

        let mut header = [0u8; 2 * MAX_VARINT_BYTES];
        let wire = self.descriptor.wire_type();
        let mut header_len = pack64(&mut header, u64::from(tag_key(self.descriptor.tag, wire)));
        let prefix_len = if wire == WireType::Length {
            let n = pack64(&mut header[header_len..], payload.len() as u64);
            header_len += n;
            n as isize
        } else {
            0
        };
        buf.write_parts(at, at, at, &header[..header_len], payload)?;

        let start = at + header_len;
        self.part = Part::from_raw(
            Version::Valid(buf.version()),
            Offset {
                start,
                end: start + payload.len(),
                diff: Diff {
                    origin: -(header_len as isize),
                    tag: -(header_len as isize),
                    length: if prefix_len > 0 {
                        -prefix_len
                    } else {
                        -(header_len as isize)
                    },
                },
            },
        );
        self.default = None;
        relength_lineage(&mut self.lineage, buf)
    }

    /// Delete the field — header and payload. Synthetic fields are
    /// already absent; clearing them is a no-op.
    pub fn clear(&mut self, buf: &mut Buffer<'_>) -> Result<(), Error> {
        if self.default.is_some() {
            return Ok(());
        }
        self.part.clear(buf)?;
        relength_lineage(&mut self.lineage, buf)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared payload codec helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a field payload per schema type.
///
/// An empty payload is a legitimate empty value for length-delimited
/// types and `ABSENT` otherwise. Decode failures map per wire type:
/// `VARINT` for bad varints, `UNDERRUN` for short fixed-width payloads,
/// `DESCRIPTOR` for non-UTF-8 strings.
pub(crate) fn decode_payload(typ: Type, payload: &[u8]) -> Result<Value<'_>, Error> {
    match typ.wire_type() {
        WireType::Length => {
            let (value, _) = varint::unpack(typ, payload).ok_or(Error::Descriptor)?;
            Ok(value)
        }
        WireType::Varint => {
            if payload.is_empty() {
                return Err(Error::Absent);
            }
            let (value, _) = varint::unpack(typ, payload).ok_or(Error::Varint)?;
            Ok(value)
        }
        WireType::Bit32 | WireType::Bit64 => {
            if payload.is_empty() {
                return Err(Error::Absent);
            }
            let (value, _) = varint::unpack(typ, payload).ok_or(Error::Underrun)?;
            Ok(value)
        }
    }
}

/// Whether two values encode to identical payload bytes.
fn payloads_equal(typ: Type, a: &Value<'_>, b: &Value<'_>) -> Result<bool, Error> {
    if typ.is_length_delimited() {
        return Ok(a.payload() == b.payload());
    }
    let (left, n) = pack_staged(typ, a)?;
    let (right, m) = pack_staged(typ, b)?;
    Ok(left[..n] == right[..m])
}
