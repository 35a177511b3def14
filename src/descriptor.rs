//! Static schema descriptor tables.
//!
//! Descriptors are read-only tables the core consumes; it never allocates
//! or builds them. They are meant to be emitted by an external schema
//! compiler as `static` items, so every reference here is `'static` and
//! message graphs may be cyclic (a message may contain itself).
//!
//! The one runtime-mutable piece is the extension link: messages can be
//! extended after the fact by chaining another descriptor's fields onto
//! the lookup path.

use core::cell::Cell;
use core::fmt;

use crate::types::{Label, Type, Value, WireType};

// ─────────────────────────────────────────────────────────────────────────────
// Field descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Cross-reference from a field to the table describing its payload.
#[derive(Clone, Copy)]
pub enum Refer {
    Message(&'static MessageDescriptor),
    Enum(&'static EnumDescriptor),
}

/// Schema-provided value information for a field.
#[derive(Clone, Copy)]
pub enum FieldValue {
    /// Default returned by reads when the field is absent.
    Default(Value<'static>),
    /// Membership in a oneof group.
    Oneof(&'static OneofDescriptor),
}

/// Descriptor of a single field.
pub struct FieldDescriptor {
    /// Field number on the wire.
    pub tag: u32,
    pub name: &'static str,
    pub typ: Type,
    pub label: Label,
    /// Nested message or enum table, for `MESSAGE` / `ENUM` fields.
    pub refer: Option<Refer>,
    /// Default value or oneof membership.
    pub value: Option<FieldValue>,
    /// Repeated scalar values are concatenated in one length-delimited
    /// field when set.
    pub packed: bool,
}

impl FieldDescriptor {
    /// A plain singular field with no default, refer, or flags.
    pub const fn scalar(tag: u32, name: &'static str, typ: Type, label: Label) -> FieldDescriptor {
        FieldDescriptor {
            tag,
            name,
            typ,
            label,
            refer: None,
            value: None,
            packed: false,
        }
    }

    /// Wire type of this field's values (packed runs are carried as
    /// `Length` on the wire regardless).
    pub const fn wire_type(&self) -> WireType {
        self.typ.wire_type()
    }

    /// Whether occurrences are encoded as a packed run.
    pub const fn is_packed(&self) -> bool {
        self.packed && matches!(self.label, Label::Repeated) && self.typ.packable()
    }

    /// The schema default, if one is declared.
    pub fn default(&self) -> Option<Value<'static>> {
        match self.value {
            Some(FieldValue::Default(v)) => Some(v),
            _ => None,
        }
    }

    /// The oneof group this field belongs to, if any.
    pub fn oneof(&self) -> Option<&'static OneofDescriptor> {
        match self.value {
            Some(FieldValue::Oneof(o)) => Some(o),
            _ => None,
        }
    }

    /// Nested message table for `MESSAGE` fields.
    pub fn message(&self) -> Option<&'static MessageDescriptor> {
        match self.refer {
            Some(Refer::Message(m)) => Some(m),
            _ => None,
        }
    }

    /// Enum table for `ENUM` fields.
    pub fn enumeration(&self) -> Option<&'static EnumDescriptor> {
        match self.refer {
            Some(Refer::Enum(e)) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .field("typ", &self.typ)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime-settable link to a descriptor extending this message.
///
/// Descriptors live in statics, so the link is a `Cell` behind the
/// crate-wide single-threaded contract.
pub struct ExtensionLink(Cell<Option<&'static MessageDescriptor>>);

// SAFETY: mutation of the link is covered by the crate contract — a
// descriptor graph is only extended and read from one thread (or under
// external exclusion), like every other shared structure here.
unsafe impl Sync for ExtensionLink {}

impl ExtensionLink {
    pub const fn none() -> ExtensionLink {
        ExtensionLink(Cell::new(None))
    }

    pub fn get(&self) -> Option<&'static MessageDescriptor> {
        self.0.get()
    }
}

impl Default for ExtensionLink {
    fn default() -> Self {
        ExtensionLink::none()
    }
}

/// Descriptor of a message: its field table plus an optional chain of
/// extension descriptors searched after it.
pub struct MessageDescriptor {
    pub fields: &'static [FieldDescriptor],
    pub extension: ExtensionLink,
}

impl MessageDescriptor {
    pub const fn new(fields: &'static [FieldDescriptor]) -> MessageDescriptor {
        MessageDescriptor {
            fields,
            extension: ExtensionLink::none(),
        }
    }

    /// Look up a field by tag, searching this table first and then the
    /// extension chain in order.
    pub fn field_by_tag(&'static self, tag: u32) -> Option<&'static FieldDescriptor> {
        let mut table: &'static MessageDescriptor = self;
        loop {
            if let Some(field) = table.fields.iter().find(|f| f.tag == tag) {
                return Some(field);
            }
            table = table.extension.get()?;
        }
    }

    /// Total number of fields, extensions included.
    pub fn len(&'static self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.extension.get().is_none()
    }

    /// Iterate all fields: own table first, then each extension in chain
    /// order.
    pub fn iter(&'static self) -> FieldIter {
        FieldIter {
            table: Some(self),
            index: 0,
        }
    }

    /// Append `other` at the tail of the extension chain, unless it is
    /// already present (identity check over the whole chain).
    pub fn extend(&'static self, other: &'static MessageDescriptor) {
        if core::ptr::eq(self, other) {
            return;
        }
        let mut tail: &'static MessageDescriptor = self;
        while let Some(next) = tail.extension.get() {
            if core::ptr::eq(next, other) {
                return;
            }
            tail = next;
        }
        tail.extension.0.set(Some(other));
    }
}

/// Iterator over a message's fields, extension chain included.
pub struct FieldIter {
    table: Option<&'static MessageDescriptor>,
    index: usize,
}

impl Iterator for FieldIter {
    type Item = &'static FieldDescriptor;

    fn next(&mut self) -> Option<&'static FieldDescriptor> {
        loop {
            let table = self.table?;
            if let Some(field) = table.fields.get(self.index) {
                self.index += 1;
                return Some(field);
            }
            self.table = table.extension.get();
            self.index = 0;
        }
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("fields", &self.fields.len())
            .field("extended", &self.extension.get().is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Enum descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// One named enum value.
pub struct EnumValueDescriptor {
    pub number: i32,
    pub name: &'static str,
}

/// Descriptor of an enum: its value table.
pub struct EnumDescriptor {
    pub values: &'static [EnumValueDescriptor],
}

impl EnumDescriptor {
    pub const fn new(values: &'static [EnumValueDescriptor]) -> EnumDescriptor {
        EnumDescriptor { values }
    }

    pub fn value_by_number(&self, number: i32) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.number == number)
    }

    pub fn name_of(&self, number: i32) -> Option<&'static str> {
        self.value_by_number(number).map(|v| v.name)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, EnumValueDescriptor> {
        self.values.iter()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Oneof descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Descriptor of a oneof group: the owning message plus the indices of
/// the member fields inside its field table.
pub struct OneofDescriptor {
    pub descriptor: &'static MessageDescriptor,
    pub indices: &'static [usize],
}

impl OneofDescriptor {
    /// Iterate the member fields of the group.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> + '_ {
        self.indices.iter().map(|&i| &self.descriptor.fields[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static COLOR: EnumDescriptor = EnumDescriptor::new(&[
        EnumValueDescriptor {
            number: 0,
            name: "RED",
        },
        EnumValueDescriptor {
            number: 2,
            name: "BLUE",
        },
    ]);

    static INNER: MessageDescriptor = MessageDescriptor::new(&[FieldDescriptor::scalar(
        1,
        "leaf",
        Type::Uint32,
        Label::Optional,
    )]);

    // Self-referential: a node holds more nodes.
    static NODE: MessageDescriptor = MessageDescriptor::new(&[
        FieldDescriptor::scalar(1, "id", Type::Uint64, Label::Required),
        FieldDescriptor {
            tag: 2,
            name: "child",
            typ: Type::Message,
            label: Label::Repeated,
            refer: Some(Refer::Message(&NODE)),
            value: None,
            packed: false,
        },
        FieldDescriptor {
            tag: 3,
            name: "color",
            typ: Type::Enum,
            label: Label::Optional,
            refer: Some(Refer::Enum(&COLOR)),
            value: None,
            packed: false,
        },
    ]);

    static EXT_A: MessageDescriptor = MessageDescriptor::new(&[FieldDescriptor::scalar(
        100,
        "ext_a",
        Type::String,
        Label::Optional,
    )]);

    static EXT_B: MessageDescriptor = MessageDescriptor::new(&[FieldDescriptor::scalar(
        101,
        "ext_b",
        Type::String,
        Label::Optional,
    )]);

    static BASE: MessageDescriptor = MessageDescriptor::new(&[FieldDescriptor::scalar(
        1,
        "base",
        Type::Uint32,
        Label::Optional,
    )]);

    #[test]
    fn lookup_by_tag() {
        assert_eq!(NODE.field_by_tag(1).unwrap().name, "id");
        assert_eq!(NODE.field_by_tag(3).unwrap().name, "color");
        assert!(NODE.field_by_tag(9).is_none());
    }

    #[test]
    fn cyclic_reference_resolves() {
        let child = NODE.field_by_tag(2).unwrap();
        let nested = child.message().unwrap();
        assert_eq!(nested.field_by_tag(1).unwrap().name, "id");
    }

    #[test]
    fn enum_lookup() {
        let color = NODE.field_by_tag(3).unwrap().enumeration().unwrap();
        assert_eq!(color.name_of(2), Some("BLUE"));
        assert_eq!(color.name_of(1), None);
        assert_eq!(color.value_by_number(0).unwrap().name, "RED");
    }

    #[test]
    fn extension_chain() {
        BASE.extend(&EXT_A);
        BASE.extend(&EXT_B);
        // Repeat appends are identity-checked no-ops.
        BASE.extend(&EXT_A);
        BASE.extend(&BASE);

        assert_eq!(BASE.field_by_tag(100).unwrap().name, "ext_a");
        assert_eq!(BASE.field_by_tag(101).unwrap().name, "ext_b");
        assert_eq!(BASE.len(), 3);

        let names: Vec<&str> = BASE.iter().map(|f| f.name).collect();
        assert_eq!(names, ["base", "ext_a", "ext_b"]);
        assert_eq!(INNER.len(), 1);
    }

    static CHOICE: MessageDescriptor = MessageDescriptor::new(&[
        FieldDescriptor {
            tag: 1,
            name: "text",
            typ: Type::String,
            label: Label::Oneof,
            refer: None,
            value: Some(FieldValue::Oneof(&CHOICE_ONEOF)),
            packed: false,
        },
        FieldDescriptor::scalar(2, "version", Type::Uint32, Label::Optional),
        FieldDescriptor {
            tag: 3,
            name: "number",
            typ: Type::Uint64,
            label: Label::Oneof,
            refer: None,
            value: Some(FieldValue::Oneof(&CHOICE_ONEOF)),
            packed: false,
        },
    ]);

    static CHOICE_ONEOF: OneofDescriptor = OneofDescriptor {
        descriptor: &CHOICE,
        indices: &[0, 2],
    };

    #[test]
    fn oneof_membership() {
        let text = CHOICE.field_by_tag(1).unwrap();
        let group = text.oneof().unwrap();
        let members: Vec<&str> = group.fields().map(|f| f.name).collect();
        assert_eq!(members, ["text", "number"]);
        assert!(CHOICE.field_by_tag(2).unwrap().oneof().is_none());
    }

    #[test]
    fn packed_requires_repeated_scalar() {
        let packed = FieldDescriptor {
            packed: true,
            ..FieldDescriptor::scalar(6, "values", Type::Float, Label::Repeated)
        };
        assert!(packed.is_packed());
        let not_repeated = FieldDescriptor {
            packed: true,
            ..FieldDescriptor::scalar(6, "value", Type::Float, Label::Optional)
        };
        assert!(!not_repeated.is_packed());
    }
}
