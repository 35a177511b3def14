// Shared descriptor tables for the end-to-end tests.
//
// Wire keys: 1→0x08, 2→0x10, 3→0x18, 4→0x20, 5→0x2D, 6→0x32 (packed run),
// 8→0x42, 10→0x50, 12→0x62.
#[allow(dead_code)]

use pbwire::{FieldDescriptor, FieldValue, Label, MessageDescriptor, Refer, Type, Value};

pub static LEAF: MessageDescriptor = MessageDescriptor::new(&[FieldDescriptor {
    tag: 1,
    name: "weight",
    typ: Type::Uint32,
    label: Label::Optional,
    refer: None,
    value: None,
    packed: false,
}]);

pub static INNER: MessageDescriptor = MessageDescriptor::new(&[
    FieldDescriptor {
        tag: 1,
        name: "id",
        typ: Type::Uint32,
        label: Label::Required,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 2,
        name: "note",
        typ: Type::String,
        label: Label::Optional,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 3,
        name: "leaf",
        typ: Type::Message,
        label: Label::Optional,
        refer: Some(Refer::Message(&LEAF)),
        value: None,
        packed: false,
    },
]);

pub static OUTER: MessageDescriptor = MessageDescriptor::new(&[
    FieldDescriptor {
        tag: 1,
        name: "count",
        typ: Type::Uint32,
        label: Label::Optional,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 2,
        name: "total",
        typ: Type::Uint64,
        label: Label::Optional,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 3,
        name: "delta",
        typ: Type::Sint32,
        label: Label::Optional,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 4,
        name: "enabled",
        typ: Type::Bool,
        label: Label::Optional,
        refer: None,
        value: Some(FieldValue::Default(Value::Bool(true))),
        packed: false,
    },
    FieldDescriptor {
        tag: 5,
        name: "checksum",
        typ: Type::Fixed32,
        label: Label::Optional,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 6,
        name: "samples",
        typ: Type::Float,
        label: Label::Repeated,
        refer: None,
        value: None,
        packed: true,
    },
    FieldDescriptor {
        tag: 8,
        name: "name",
        typ: Type::String,
        label: Label::Optional,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 10,
        name: "totals",
        typ: Type::Uint64,
        label: Label::Repeated,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 12,
        name: "inner",
        typ: Type::Message,
        label: Label::Optional,
        refer: Some(Refer::Message(&INNER)),
        value: None,
        packed: false,
    },
]);
