// End-to-end: live anchors staying coherent across buffer mutations.

mod fixtures {
    include!("fixtures.rs");
}

use fixtures::OUTER;
use pbwire::{Buffer, Cursor, Error, Field, Message, Value};

/// A cursor created before a front insert keeps visiting the same
/// values at their shifted offsets.
#[test]
fn cursor_survives_front_insert() {
    let mut buf = Buffer::copy_from(&[0x50, 0x01, 0x50, 0x02, 0x50, 0x03, 0x50, 0x04]);
    let msg = Message::create(&OUTER, &buf);
    let mut cursor = Cursor::find(&msg, &buf, 10);
    assert!(cursor.is_valid());
    assert_eq!(cursor.get(&buf).unwrap(), Value::Uint64(1));

    // Field 1 = 127 spliced in at the front.
    buf.write(0, 0, &[0x08, 0x7F]).unwrap();
    assert_eq!(
        buf.data(),
        &[0x08, 0x7F, 0x50, 0x01, 0x50, 0x02, 0x50, 0x03, 0x50, 0x04]
    );

    assert_eq!(cursor.get(&buf).unwrap(), Value::Uint64(1));
    let mut seen = vec![1u64];
    while cursor.next(&buf) {
        match cursor.get(&buf).unwrap() {
            Value::Uint64(v) => seen.push(v),
            other => panic!("unexpected value {other:?}"),
        }
    }
    assert_eq!(seen, [1, 2, 3, 4]);
    assert_eq!(cursor.error(), Some(Error::Offset));
}

/// Clearing one field invalidates anchors on it and shifts anchors on
/// later fields by the removed byte count.
#[test]
fn clear_invalidates_one_part_and_shifts_the_other() {
    // Field 8 "abc" followed by field 2 = 42.
    let mut buf = Buffer::copy_from(&[0x42, 0x03, b'a', b'b', b'c', 0x10, 0x2A]);
    let msg = Message::create(&OUTER, &buf);

    let mut a = Field::create(&msg, &mut buf, 8).unwrap();
    let mut b = Field::create(&msg, &mut buf, 2).unwrap();
    assert_eq!(b.part().offset().start, 6);

    a.clear(&mut buf).unwrap();
    assert!(!a.is_valid());
    assert_eq!(a.error(), Some(Error::Invalid));

    b.align(&buf).unwrap();
    // Five bytes of header + payload vanished ahead of it.
    assert_eq!(b.part().offset().start, 1);
    assert_eq!(b.get(&buf).unwrap(), Value::Uint64(42));
    assert_eq!(buf.data(), &[0x10, 0x2A]);
}

/// A part whose region is overwritten by a second anchor on the same
/// field resizes rather than invalidates.
#[test]
fn twin_anchors_track_each_other() {
    let mut buf = Buffer::copy_from(&[0x42, 0x02, b'h', b'i', 0x08, 0x05]);
    let msg = Message::create(&OUTER, &buf);

    let mut one = Field::create(&msg, &mut buf, 8).unwrap();
    let two = Field::create(&msg, &mut buf, 8).unwrap();

    one.put(&mut buf, &Value::String("gone!")).unwrap();
    assert_eq!(two.get(&buf).unwrap(), Value::String("gone!"));

    // The sibling after the string shifted by the growth.
    let after = Field::create(&msg, &mut buf, 1).unwrap();
    assert_eq!(after.get(&buf).unwrap(), Value::Uint32(5));
    assert_eq!(after.part().offset().start, 8);
}

/// Offsets accumulate the algebraic sum of every preceding delta across
/// a mixed write/clear sequence.
#[test]
fn anchors_accumulate_mixed_deltas() {
    // Fields 1, 2, 8 in order.
    let mut buf = Buffer::copy_from(&[0x08, 0x01, 0x10, 0x02, 0x42, 0x01, b'z']);
    let msg = Message::create(&OUTER, &buf);
    let mut tail = Field::create(&msg, &mut buf, 8).unwrap();
    assert_eq!(tail.part().offset().start, 6);

    let mut first = Field::create(&msg, &mut buf, 1).unwrap();
    first.put(&mut buf, &Value::Uint32(1_000_000)).unwrap(); // +2
    let mut second = Field::create(&msg, &mut buf, 2).unwrap();
    second.clear(&mut buf).unwrap(); // -2

    tail.align(&buf).unwrap();
    assert_eq!(tail.part().offset().start, 6);
    assert_eq!(tail.get(&buf).unwrap(), Value::String("z"));
}

/// Erasing a field ahead of a live message keeps the message aligned to
/// the shrunken region.
#[test]
fn message_size_tracks_erasure() {
    let mut buf = Buffer::copy_from(&[0x08, 0x01, 0x10, 0x02]);
    let msg = Message::create(&OUTER, &buf);
    assert_eq!(msg.size(&buf).unwrap(), 4);

    msg.erase(&mut buf, 1).unwrap();
    assert_eq!(msg.size(&buf).unwrap(), 2);
    assert_eq!(buf.data(), &[0x10, 0x02]);
}

/// Stale anchors on erased regions stay invalid no matter what happens
/// to the buffer afterwards.
#[test]
fn invalidation_outlives_later_edits() {
    let mut buf = Buffer::copy_from(&[0x08, 0x01, 0x10, 0x02]);
    let msg = Message::create(&OUTER, &buf);
    let mut doomed = Field::create(&msg, &mut buf, 1).unwrap();

    msg.erase(&mut buf, 1).unwrap();
    assert_eq!(doomed.align(&buf), Err(Error::Invalid));

    msg.put(&mut buf, 1, &Value::Uint32(9)).unwrap();
    assert_eq!(doomed.align(&buf), Err(Error::Invalid));
    assert_eq!(doomed.get(&buf), Err(Error::Invalid));
}
