// End-to-end: message-level lookup, mutation, erasure, validation.

mod fixtures {
    include!("fixtures.rs");
}

use fixtures::{INNER, OUTER};
use pbwire::{Buffer, Error, Message, Value};

#[test]
fn has_observes_presence() {
    let mut buf = Buffer::copy_from(&[0x08, 0x01]);
    let msg = Message::create(&OUTER, &buf);
    assert!(msg.has(&buf, 1));
    assert!(!msg.has(&buf, 2));

    msg.put(&mut buf, 2, &Value::Uint64(7)).unwrap();
    assert!(msg.has(&buf, 2));
}

#[test]
fn put_get_round_trip_per_type() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);

    msg.put(&mut buf, 1, &Value::Uint32(1_000_000_000)).unwrap();
    msg.put(&mut buf, 3, &Value::Sint32(-1_000_000_000)).unwrap();
    msg.put(&mut buf, 5, &Value::Fixed32(0xAABBCCDD)).unwrap();
    msg.put(&mut buf, 8, &Value::String("wire")).unwrap();

    assert_eq!(msg.get(&buf, 1).unwrap(), Value::Uint32(1_000_000_000));
    assert_eq!(msg.get(&buf, 3).unwrap(), Value::Sint32(-1_000_000_000));
    assert_eq!(msg.get(&buf, 5).unwrap(), Value::Fixed32(0xAABBCCDD));
    assert_eq!(msg.get(&buf, 8).unwrap(), Value::String("wire"));

    // The zig-zag bytes of −1e9 sit on the wire verbatim.
    let start = buf
        .data()
        .windows(5)
        .position(|w| w == &[0xFF, 0xA7, 0xD6, 0xB9, 0x07][..]);
    assert!(start.is_some(), "zig-zag encoding not found on the wire");
}

#[test]
fn get_falls_back_to_default() {
    let buf = Buffer::copy_from(&[0x08, 0x01]);
    let msg = Message::create(&OUTER, &buf);
    // Field 4 is absent but declares default true.
    assert_eq!(msg.get(&buf, 4).unwrap(), Value::Bool(true));
    // Field 2 is absent with no default.
    assert_eq!(msg.get(&buf, 2), Err(Error::Absent));
    // Unknown tag.
    assert_eq!(msg.get(&buf, 99), Err(Error::Descriptor));
}

#[test]
fn get_rejects_repeated_tags() {
    let buf = Buffer::copy_from(&[0x50, 0x01, 0x50, 0x02]);
    let msg = Message::create(&OUTER, &buf);
    assert_eq!(msg.get(&buf, 10), Err(Error::Invalid));
}

#[test]
fn put_overwrites_existing_value() {
    let mut buf = Buffer::copy_from(&[0x08, 0x05, 0x10, 0x06]);
    let msg = Message::create(&OUTER, &buf);
    msg.put(&mut buf, 1, &Value::Uint32(300)).unwrap();
    assert_eq!(msg.get(&buf, 1).unwrap(), Value::Uint32(300));
    assert_eq!(msg.get(&buf, 2).unwrap(), Value::Uint64(6));
    assert_eq!(buf.data(), &[0x08, 0xAC, 0x02, 0x10, 0x06]);
}

#[test]
fn erase_removes_every_occurrence() {
    // totals ×3 interleaved with other fields.
    let mut buf = Buffer::copy_from(&[
        0x50, 0x01, // totals = 1
        0x08, 0x09, // count = 9
        0x50, 0x02, // totals = 2
        0x42, 0x01, b'n', // name = "n"
        0x50, 0x03, // totals = 3
    ]);
    let msg = Message::create(&OUTER, &buf);

    msg.erase(&mut buf, 10).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x09, 0x42, 0x01, b'n']);
    assert!(!msg.has(&buf, 10));

    // Idempotent: erasing again is a no-op success.
    msg.erase(&mut buf, 10).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x09, 0x42, 0x01, b'n']);
}

#[test]
fn erase_on_empty_message_succeeds() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);
    msg.erase(&mut buf, 1).unwrap();
    assert!(buf.is_empty());
}

#[test]
fn clear_releases_the_region() {
    let mut buf = Buffer::copy_from(&[0x08, 0x01, 0x10, 0x02]);
    let mut msg = Message::create(&OUTER, &buf);
    msg.clear(&mut buf).unwrap();
    assert!(buf.is_empty());
    assert!(!msg.is_valid());
    assert_eq!(msg.error(), Some(Error::Invalid));
}

#[test]
fn put_message_copies_from_separate_buffer() {
    let mut inner_buf = Buffer::empty();
    let inner = Message::create(&INNER, &inner_buf);
    inner.put(&mut inner_buf, 1, &Value::Uint32(5)).unwrap();
    assert_eq!(inner_buf.data(), &[0x08, 0x05]);

    let mut buf = Buffer::copy_from(&[0x08, 0x01]);
    let msg = Message::create(&OUTER, &buf);
    let payload = Value::Message(inner_buf.data());
    msg.put(&mut buf, 12, &payload).unwrap();

    assert_eq!(buf.data(), &[0x08, 0x01, 0x62, 0x02, 0x08, 0x05]);
    assert_eq!(
        msg.get(&buf, 12).unwrap(),
        Value::Message(&[0x08, 0x05][..])
    );
    msg.check(&buf).unwrap();
}

#[test]
fn check_accepts_well_formed_messages() {
    let buf = Buffer::copy_from(&[0x08, 0x01, 0x62, 0x02, 0x08, 0x05]);
    let msg = Message::create(&OUTER, &buf);
    msg.check(&buf).unwrap();

    // Empty outer message: no required fields at the top level.
    let empty = Buffer::empty();
    Message::create(&OUTER, &empty).check(&empty).unwrap();
}

#[test]
fn check_flags_duplicate_singular_fields() {
    let buf = Buffer::copy_from(&[0x08, 0x01, 0x08, 0x02]);
    let msg = Message::create(&OUTER, &buf);
    assert_eq!(msg.check(&buf), Err(Error::Invalid));

    // Repeated tags may occur any number of times.
    let repeated = Buffer::copy_from(&[0x50, 0x01, 0x50, 0x02, 0x50, 0x03]);
    Message::create(&OUTER, &repeated).check(&repeated).unwrap();
}

#[test]
fn check_flags_missing_required_recursively() {
    // Sub-message present but empty: INNER requires field 1.
    let buf = Buffer::copy_from(&[0x62, 0x00]);
    let msg = Message::create(&OUTER, &buf);
    assert_eq!(msg.check(&buf), Err(Error::Absent));

    // Required satisfied one level down.
    let ok = Buffer::copy_from(&[0x62, 0x02, 0x08, 0x05]);
    Message::create(&OUTER, &ok).check(&ok).unwrap();
}

#[test]
fn check_skips_unknown_tags() {
    // Tag 7 (varint) is not in the outer schema.
    let buf = Buffer::copy_from(&[0x38, 0x09, 0x08, 0x01]);
    let msg = Message::create(&OUTER, &buf);
    msg.check(&buf).unwrap();
}

#[test]
fn invalid_buffer_surfaces_through_message() {
    let buf = Buffer::invalid();
    let msg = Message::create(&OUTER, &buf);
    assert!(!msg.is_valid());
    assert_eq!(msg.error(), Some(Error::Invalid));
    assert_eq!(msg.get(&buf, 1), Err(Error::Invalid));
}
