//! Message-level operations.
//!
//! A message is a part whose payload is a sequence of tagged fields. The
//! root message spans a whole buffer; sub-messages are length-prefixed
//! parts inside it. Each message object carries its lineage — the chain
//! of enclosing length-prefixed parts — so that size-changing operations
//! can re-emit every enclosing length prefix.

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::descriptor::MessageDescriptor;
use crate::error::Error;
use crate::field::Field;
use crate::part::{relength_lineage, Part};
use crate::types::{Label, Type, Value};

/// Operations over one message region of a buffer.
#[derive(Debug, Clone)]
pub struct Message {
    descriptor: &'static MessageDescriptor,
    part: Part,
    /// Enclosing length-prefixed parts, outermost first. Empty for the
    /// root message.
    lineage: Vec<Part>,
}

impl Message {
    // ─────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────

    /// The root message over the entire buffer.
    ///
    /// An invalid buffer yields a message whose part is invalid; the
    /// failure is observable through [`error`](Message::error).
    pub fn create(descriptor: &'static MessageDescriptor, buf: &Buffer<'_>) -> Message {
        Message {
            descriptor,
            part: Part::from_binary(buf),
            lineage: Vec::new(),
        }
    }

    /// The sub-message stored in field `tag`, created empty if absent.
    ///
    /// The descriptor entry for `tag` must be a singular `MESSAGE` field.
    pub fn create_within(&self, buf: &mut Buffer<'_>, tag: u32) -> Result<Message, Error> {
        let field = self
            .descriptor
            .field_by_tag(tag)
            .ok_or(Error::Descriptor)?;
        if field.typ != Type::Message || !field.label.is_singular() {
            return Err(Error::Descriptor);
        }
        let nested = field.message().ok_or(Error::Descriptor)?;

        let part = Part::create(self, buf, tag)?;
        let mut lineage = self.child_lineage();
        // Creation may have appended an empty field header; every
        // enclosing prefix picks up the growth.
        relength_lineage(&mut lineage, buf)?;
        Ok(Message {
            descriptor: nested,
            part,
            lineage,
        })
    }

    /// Descend through a chain of singular `MESSAGE` tags, creating
    /// intermediate messages as needed.
    ///
    /// Intermediates appended on the way are retained even when a later
    /// step fails; there is no rollback.
    pub fn create_nested(&self, buf: &mut Buffer<'_>, tags: &[u32]) -> Result<Message, Error> {
        let (&first, rest) = tags.split_first().ok_or(Error::Descriptor)?;
        let mut message = self.create_within(buf, first)?;
        for &tag in rest {
            message = message.create_within(buf, tag)?;
        }
        Ok(message)
    }

    pub(crate) fn from_parts(
        descriptor: &'static MessageDescriptor,
        part: Part,
        lineage: Vec<Part>,
    ) -> Message {
        Message {
            descriptor,
            part,
            lineage,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────

    pub fn descriptor(&self) -> &'static MessageDescriptor {
        self.descriptor
    }

    /// Copy of the underlying part anchor.
    pub fn part(&self) -> Part {
        self.part
    }

    pub fn is_valid(&self) -> bool {
        self.part.is_valid()
    }

    pub fn error(&self) -> Option<Error> {
        self.part.error()
    }

    /// Payload size in bytes, aligned.
    pub fn size(&self, buf: &Buffer<'_>) -> Result<usize, Error> {
        let mut part = self.part;
        part.size(buf)
    }

    /// The lineage a child part of this message inherits: the message's
    /// own lineage plus the message itself when it is length-prefixed.
    pub(crate) fn child_lineage(&self) -> Vec<Part> {
        let mut lineage = self.lineage.clone();
        if self.part.offset().has_prefix() {
            lineage.push(self.part);
        }
        lineage
    }

    /// Whether at least one occurrence of `tag` exists.
    pub fn has(&self, buf: &Buffer<'_>, tag: u32) -> bool {
        Cursor::find(self, buf, tag).is_valid()
    }

    /// Read the single value of `tag`.
    ///
    /// Falls back to the schema default when the field is absent and one
    /// is declared; `ABSENT` when neither exists. Repeated tags cannot be
    /// read this way (`INVALID`) — walk them with a cursor.
    pub fn get<'b>(&self, buf: &'b Buffer<'_>, tag: u32) -> Result<Value<'b>, Error> {
        let field = self
            .descriptor
            .field_by_tag(tag)
            .ok_or(Error::Descriptor)?;
        if !field.label.is_singular() {
            return Err(Error::Invalid);
        }
        let mut cursor = Cursor::find(self, buf, tag);
        if cursor.is_valid() {
            return cursor.get(buf);
        }
        match cursor.error() {
            Some(Error::Offset) => field.default().ok_or(Error::Absent),
            Some(error) => Err(error),
            None => unreachable!("invalid cursor carries an error"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Write the single value of `tag`, creating the field if absent.
    ///
    /// `MESSAGE` values are serialized sub-messages copied in whole; the
    /// borrow rules keep the source bytes from aliasing the buffer being
    /// written.
    pub fn put(&self, buf: &mut Buffer<'_>, tag: u32, value: &Value<'_>) -> Result<(), Error> {
        let field = self
            .descriptor
            .field_by_tag(tag)
            .ok_or(Error::Descriptor)?;
        if value.schema_type() != field.typ {
            return Err(Error::Descriptor);
        }
        if field.typ == Type::Message {
            let payload = value.payload().ok_or(Error::Descriptor)?;
            let mut part = Part::create(self, buf, tag)?;
            part.write(buf, payload)?;
            let mut lineage = self.child_lineage();
            relength_lineage(&mut lineage, buf)
        } else {
            let mut field = Field::create(self, buf, tag)?;
            field.put(buf, value)
        }
    }

    /// Delete every occurrence of `tag`. Walking off the end of the
    /// message is success, which makes erasure idempotent.
    pub fn erase(&self, buf: &mut Buffer<'_>, tag: u32) -> Result<(), Error> {
        self.descriptor
            .field_by_tag(tag)
            .ok_or(Error::Descriptor)?;
        let mut cursor = Cursor::find(self, buf, tag);
        while cursor.is_valid() {
            cursor.erase(buf)?;
            if !cursor.next(buf) {
                break;
            }
        }
        match cursor.error() {
            None | Some(Error::Offset) | Some(Error::Invalid) => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Delete the whole message region — header included for
    /// sub-messages. The message object is invalid afterwards.
    pub fn clear(&mut self, buf: &mut Buffer<'_>) -> Result<(), Error> {
        self.part.clear(buf)?;
        relength_lineage(&mut self.lineage, buf)
    }

    /// Recursive schema validation.
    ///
    /// Fails with `INVALID` when a singular tag occurs twice, `ABSENT`
    /// when a required tag is missing, and propagates wire-level errors
    /// from the walk. Unknown tags are skipped silently.
    pub fn check(&self, buf: &Buffer<'_>) -> Result<(), Error> {
        let mut seen: Vec<u32> = Vec::new();
        let mut cursor = Cursor::over(self, buf);
        if cursor.is_valid() {
            loop {
                let field = cursor
                    .field_descriptor()
                    .ok_or(Error::Invalid)?;
                if field.label.is_singular() && seen.contains(&field.tag) {
                    return Err(Error::Invalid);
                }
                seen.push(field.tag);
                if field.typ == Type::Message {
                    let nested = field.message().ok_or(Error::Descriptor)?;
                    let sub = Message::from_parts(nested, cursor.current()?, Vec::new());
                    sub.check(buf)?;
                }
                if !cursor.next(buf) {
                    break;
                }
            }
        }
        match cursor.error() {
            None | Some(Error::Offset) => {}
            Some(error) => return Err(error),
        }
        for field in self.descriptor.iter() {
            if matches!(field.label, Label::Required) && !seen.contains(&field.tag) {
                return Err(Error::Absent);
            }
        }
        Ok(())
    }

    /// Realign the message part against the buffer's journal.
    pub fn align(&mut self, buf: &Buffer<'_>) -> Result<(), Error> {
        self.part.align(buf)
    }
}
