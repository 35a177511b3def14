#![no_main]
use libfuzzer_sys::fuzz_target;

use pbwire::{Buffer, FieldDescriptor, Label, Message, MessageDescriptor, Type};

static ROOT: MessageDescriptor = MessageDescriptor::new(&[
    FieldDescriptor {
        tag: 1,
        name: "count",
        typ: Type::Uint32,
        label: Label::Repeated,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 2,
        name: "blob",
        typ: Type::Bytes,
        label: Label::Repeated,
        refer: None,
        value: None,
        packed: false,
    },
    FieldDescriptor {
        tag: 3,
        name: "ticks",
        typ: Type::Fixed64,
        label: Label::Repeated,
        refer: None,
        value: None,
        packed: true,
    },
]);

fuzz_target!(|data: &[u8]| {
    // Erasure over arbitrary bytes: every outcome is acceptable except a
    // panic, and a second erase of the same tag must be a no-op.
    let mut buf = Buffer::copy_from(data);
    let msg = Message::create(&ROOT, &buf);

    for tag in [1u32, 2, 3] {
        if msg.erase(&mut buf, tag).is_ok() {
            let before = buf.data().to_vec();
            let _ = msg.erase(&mut buf, tag);
            assert_eq!(buf.data(), &before[..], "erase of tag {tag} not idempotent");
        }
    }
});
