// End-to-end: sub-message creation and length-prefix maintenance
// across nesting levels.

mod fixtures {
    include!("fixtures.rs");
}

use fixtures::OUTER;
use pbwire::{Buffer, Error, Field, Message, Value};

/// Creating an absent sub-message appends an empty length-prefixed
/// field; creating it again binds the existing region.
#[test]
fn create_within_makes_empty_submessage() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);

    let sub = msg.create_within(&mut buf, 12).unwrap();
    assert_eq!(buf.data(), &[0x62, 0x00]);
    assert_eq!(sub.size(&buf).unwrap(), 0);

    let again = msg.create_within(&mut buf, 12).unwrap();
    assert_eq!(buf.data(), &[0x62, 0x00]);
    assert_eq!(again.size(&buf).unwrap(), 0);
}

/// Writing a field inside a sub-message updates the enclosing length
/// prefix on the wire, not just in live anchors.
#[test]
fn nested_put_updates_enclosing_prefix() {
    let mut buf = Buffer::copy_from(&[0x62, 0x02, 0x08, 0x05]);
    let msg = Message::create(&OUTER, &buf);
    let sub = msg.create_within(&mut buf, 12).unwrap();

    let mut note = Field::create(&sub, &mut buf, 2).unwrap();
    note.put(&mut buf, &Value::String("hi")).unwrap();

    assert_eq!(
        buf.data(),
        &[0x62, 0x06, 0x08, 0x05, 0x12, 0x02, b'h', b'i']
    );
    assert_eq!(sub.size(&buf).unwrap(), 6);
    assert_eq!(note.get(&buf).unwrap(), Value::String("hi"));
    msg.check(&buf).unwrap();
}

/// create_nested descends and creates the whole chain; the terminal
/// field write re-emits every prefix above it.
#[test]
fn create_nested_builds_the_chain() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);

    let mut weight = Field::create_nested(&msg, &mut buf, &[12, 3, 1]).unwrap();
    // outer.12 { inner.3 { weight } } with the empty varint field's bare
    // tag at the leaf; every prefix counts the bytes below it.
    assert_eq!(buf.data(), &[0x62, 0x03, 0x1A, 0x01, 0x08]);

    weight.put(&mut buf, &Value::Uint32(200)).unwrap();
    assert_eq!(
        buf.data(),
        &[0x62, 0x05, 0x1A, 0x03, 0x08, 0xC8, 0x01]
    );
    assert_eq!(weight.get(&buf).unwrap(), Value::Uint32(200));
}

/// Prefix growth across the 127-byte boundary shifts trailing siblings
/// and keeps their anchors aligned.
#[test]
fn prefix_growth_shifts_siblings() {
    // Sub-message then a trailing string field.
    let mut buf = Buffer::copy_from(&[0x62, 0x02, 0x08, 0x05, 0x42, 0x01, b'z']);
    let msg = Message::create(&OUTER, &buf);
    let sub = msg.create_within(&mut buf, 12).unwrap();
    let mut tail = Field::create(&msg, &mut buf, 8).unwrap();

    let mut note = Field::create(&sub, &mut buf, 2).unwrap();
    let long = "y".repeat(130);
    note.put(&mut buf, &Value::String(&long)).unwrap();

    // Inner payload: id (2) + note header (3) + 130 = 135 → 2-byte prefix.
    assert_eq!(&buf.data()[..2], &[0x62, 0x87]);
    assert_eq!(buf.data()[2], 0x01);
    assert_eq!(buf.len(), 1 + 2 + 135 + 3);

    tail.align(&buf).unwrap();
    assert_eq!(tail.get(&buf).unwrap(), Value::String("z"));
    assert_eq!(msg.get(&buf, 8).unwrap(), Value::String("z"));
    msg.check(&buf).unwrap();
}

/// Erasing inside a sub-message shrinks the enclosing prefixes.
#[test]
fn nested_erase_shrinks_prefixes() {
    let mut buf = Buffer::copy_from(&[0x62, 0x06, 0x08, 0x05, 0x12, 0x02, b'h', b'i']);
    let msg = Message::create(&OUTER, &buf);
    let sub = msg.create_within(&mut buf, 12).unwrap();

    sub.erase(&mut buf, 2).unwrap();
    assert_eq!(buf.data(), &[0x62, 0x02, 0x08, 0x05]);
    msg.check(&buf).unwrap();
}

/// Clearing a sub-message removes its header and re-emits nothing else.
#[test]
fn clear_submessage_removes_field() {
    let mut buf = Buffer::copy_from(&[0x08, 0x01, 0x62, 0x02, 0x08, 0x05]);
    let msg = Message::create(&OUTER, &buf);
    let mut sub = msg.create_within(&mut buf, 12).unwrap();

    sub.clear(&mut buf).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x01]);
    assert!(!sub.is_valid());
    assert!(!msg.has(&buf, 12));
}

/// Intermediate messages created before a failing step are retained;
/// there is no rollback.
#[test]
fn nested_failure_retains_intermediates() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);

    // Tag 99 does not exist under INNER.
    assert_eq!(
        Field::create_nested(&msg, &mut buf, &[12, 99]).unwrap_err(),
        Error::Descriptor
    );
    assert_eq!(buf.data(), &[0x62, 0x00]);
}

/// Non-message and repeated tags cannot anchor sub-messages.
#[test]
fn create_within_checks_schema() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);
    assert!(matches!(
        msg.create_within(&mut buf, 1),
        Err(Error::Descriptor)
    ));
    assert!(matches!(
        msg.create_nested(&mut buf, &[]),
        Err(Error::Descriptor)
    ));
}
