#![no_main]
use libfuzzer_sys::fuzz_target;

use pbwire::{
    Buffer, Cursor, FieldDescriptor, Label, Message, MessageDescriptor, Refer, Type,
};

static LEAF: MessageDescriptor = MessageDescriptor::new(&[FieldDescriptor {
    tag: 1,
    name: "weight",
    typ: Type::Uint32,
    label: Label::Optional,
    refer: None,
    value: None,
    packed: false,
}]);

static ROOT: MessageDescriptor = MessageDescriptor::new(&[
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
        name: "name",
        typ: Type::String,
        label: Label::Optional,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 3,
        name: "samples",
        typ: Type::Float,
        label: Label::Repeated,
        refer: None,
        value: None,
        packed: true,
    },
    FieldDescriptor {
        tag: 4,
        name: "leaf",
        typ: Type::Message,
        label: Label::Optional,
        refer: Some(Refer::Message(&LEAF)),
        value: None,
        packed: false,
    },
]);

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes through the walk and read paths: wire errors are
    // expected, panics and out-of-bounds reads are not.
    let buf = Buffer::copy_from(data);
    let msg = Message::create(&ROOT, &buf);

    let mut cursor = Cursor::over(&msg, &buf);
    let mut steps = 0usize;
    while cursor.is_valid() && steps < 1 << 16 {
        let _ = cursor.get(&buf);
        cursor.next(&buf);
        steps += 1;
    }

    let _ = msg.check(&buf);
    for tag in [1u32, 2, 3, 4] {
        let _ = msg.has(&buf, tag);
        let _ = msg.get(&buf, tag);
    }
});
