// End-to-end: cursor traversal, filtering, packed runs, in-walk edits.

mod fixtures {
    include!("fixtures.rs");
}

use fixtures::OUTER;
use pbwire::{Buffer, Cursor, Error, Message, Value};

const FLOAT_1E9_BITS: u32 = 0x3B9A_CA00;

/// Two packed floats expand into two cursor positions, 0 and 1.
#[test]
fn packed_floats_expand() {
    let mut buf = Buffer::copy_from(&[
        0x32, 0x08, // field 6, packed run of 8 bytes
        0x00, 0xCA, 0x9A, 0x3B, // float bits 0x3B9ACA00
        0x00, 0xCA, 0x9A, 0x3B,
    ]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::find(&msg, &buf, 6);

    assert!(cursor.is_valid());
    assert_eq!(cursor.pos(), 0);
    assert_eq!(
        cursor.get(&buf).unwrap(),
        Value::Float(f32::from_bits(FLOAT_1E9_BITS))
    );

    assert!(cursor.next(&buf));
    assert_eq!(cursor.pos(), 1);
    assert_eq!(
        cursor.get(&buf).unwrap(),
        Value::Float(f32::from_bits(FLOAT_1E9_BITS))
    );

    assert!(!cursor.next(&buf));
    assert_eq!(cursor.error(), Some(Error::Offset));
}

/// An unfiltered walk visits fields in buffer order and reports their
/// descriptors; unknown tags and wire-type mismatches are passed over.
#[test]
fn unfiltered_walk_in_buffer_order() {
    let buf = Buffer::copy_from(&[
        0x50, 0x0A, // totals = 10
        0x38, 0x63, // tag 7: unknown, skipped
        0x08, 0x05, // count = 5
        0x0D, 0x01, 0x02, 0x03, 0x04, // tag 1 as 32-bit: wire mismatch, skipped
        0x42, 0x02, b'h', b'i', // name = "hi"
    ]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::over(&msg, &buf);

    let mut names = Vec::new();
    while cursor.is_valid() {
        names.push(cursor.field_descriptor().unwrap().name);
        cursor.next(&buf);
    }
    assert_eq!(names, ["totals", "count", "name"]);
    assert_eq!(cursor.error(), Some(Error::Offset));
}

/// Filtered walk sees only its tag; seek stops on the first match.
#[test]
fn filtered_walk_and_seek() {
    let mut buf = Buffer::copy_from(&[
        0x50, 0x01, 0x08, 0x63, 0x50, 0x02, 0x50, 0x03, 0x42, 0x01, b'x',
    ]);
    let msg = Message::create(&OUTER, &buf);

    let mut cursor = Cursor::find(&msg, &buf, 10);
    let mut values = Vec::new();
    while cursor.is_valid() {
        match cursor.get(&buf).unwrap() {
            Value::Uint64(v) => values.push(v),
            other => panic!("unexpected {other:?}"),
        }
        cursor.next(&buf);
    }
    assert_eq!(values, [1, 2, 3]);

    let mut seeker = Cursor::find(&msg, &buf, 10);
    assert!(seeker.seek(&buf, &Value::Uint64(3)));
    assert_eq!(seeker.pos(), 2);
    assert!(!seeker.seek(&buf, &Value::Uint64(3)));

    assert_eq!(
        Cursor::find(&msg, &buf, 10).matches(&buf, &Value::Uint64(1)),
        Ok(true)
    );
}

/// Writes through the cursor edit in place and do not reposition it.
#[test]
fn put_through_cursor_keeps_position() {
    let mut buf = Buffer::copy_from(&[0x50, 0x01, 0x50, 0x02, 0x50, 0x03]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::find(&msg, &buf, 10);

    assert!(cursor.next(&buf)); // position on the middle value
    cursor.put(&mut buf, &Value::Uint64(300)).unwrap();
    assert_eq!(cursor.get(&buf).unwrap(), Value::Uint64(300));
    assert_eq!(cursor.pos(), 1);

    // The growth shifted the third value; the walk still reaches it.
    assert!(cursor.next(&buf));
    assert_eq!(cursor.get(&buf).unwrap(), Value::Uint64(3));
    assert_eq!(buf.data(), &[0x50, 0x01, 0x50, 0xAC, 0x02, 0x50, 0x03]);
}

/// Erasing through a filtered cursor, then continuing, deletes
/// occurrences one by one.
#[test]
fn erase_through_cursor() {
    let mut buf = Buffer::copy_from(&[0x50, 0x01, 0x08, 0x09, 0x50, 0x02]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::find(&msg, &buf, 10);

    cursor.erase(&mut buf).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x09, 0x50, 0x02]);
    assert!(cursor.next(&buf));
    cursor.erase(&mut buf).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x09]);
    assert!(!cursor.next(&buf));
}

/// Erasing packed values shrinks the run and re-encodes its length
/// prefix; erasing the last one removes the run header too.
#[test]
fn erase_inside_packed_run() {
    let mut buf = Buffer::copy_from(&[
        0x08, 0x07, // count = 7
        0x32, 0x08, // packed run, 8 bytes
        0x00, 0x00, 0x80, 0x3F, // 1.0f
        0x00, 0x00, 0x00, 0x40, // 2.0f
    ]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::find(&msg, &buf, 6);

    cursor.erase(&mut buf).unwrap();
    assert_eq!(
        buf.data(),
        &[0x08, 0x07, 0x32, 0x04, 0x00, 0x00, 0x00, 0x40]
    );

    assert!(cursor.next(&buf));
    assert_eq!(cursor.get(&buf).unwrap(), Value::Float(2.0));
    cursor.erase(&mut buf).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x07]);
    assert!(!cursor.next(&buf));

    // The whole tag is gone, not just its values.
    assert!(!msg.has(&buf, 6));
}

/// Same-width writes into a packed run leave the prefix alone.
#[test]
fn put_inside_packed_run() {
    let mut buf = Buffer::copy_from(&[
        0x32, 0x08, 0x00, 0x00, 0x80, 0x3F, 0x00, 0x00, 0x00, 0x40,
    ]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::find(&msg, &buf, 6);

    cursor.put(&mut buf, &Value::Float(9.5)).unwrap();
    assert_eq!(cursor.get(&buf).unwrap(), Value::Float(9.5));
    assert!(cursor.next(&buf));
    assert_eq!(cursor.get(&buf).unwrap(), Value::Float(2.0));
    assert_eq!(buf.data()[1], 0x08);
    assert_eq!(buf.version(), 0);
}

/// rewind() replays the walk from the first field.
#[test]
fn rewind_restarts_the_walk() {
    let mut buf = Buffer::copy_from(&[0x50, 0x01, 0x50, 0x02]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::find(&msg, &buf, 10);

    while cursor.next(&buf) {}
    assert_eq!(cursor.error(), Some(Error::Offset));

    assert!(cursor.rewind(&buf));
    assert!(cursor.is_valid());
    assert_eq!(cursor.pos(), 0);
    assert_eq!(cursor.get(&buf).unwrap(), Value::Uint64(1));

    // A cursor that never was valid cannot rewind into validity.
    let mut dead = Cursor::find(&msg, &buf, 99);
    assert_eq!(dead.error(), Some(Error::Descriptor));
    assert!(!dead.rewind(&buf));
    assert_eq!(dead.error(), Some(Error::Descriptor));
}

/// Group wire types terminate the walk with a wire error.
#[test]
fn group_tags_are_malformed() {
    let buf = Buffer::copy_from(&[0x0B, 0x00]); // tag 1, wire type 3
    let msg = Message::create(&OUTER, &buf);
    let cursor = Cursor::over(&msg, &buf);
    assert!(!cursor.is_valid());
    assert_eq!(cursor.error(), Some(Error::Varint));
}

/// A length prefix overrunning the message region is an underrun.
#[test]
fn overlong_length_prefix_underruns() {
    let buf = Buffer::copy_from(&[0x42, 0x7F, b'x']);
    let msg = Message::create(&OUTER, &buf);
    let cursor = Cursor::find(&msg, &buf, 8);
    assert!(!cursor.is_valid());
    assert_eq!(cursor.error(), Some(Error::Underrun));
}

/// An empty message yields an immediately-exhausted cursor.
#[test]
fn empty_message_cursor() {
    let buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);
    let cursor = Cursor::over(&msg, &buf);
    assert!(!cursor.is_valid());
    assert_eq!(cursor.error(), Some(Error::Offset));
}
