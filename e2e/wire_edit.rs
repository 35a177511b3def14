// End-to-end: in-place field edits on flat messages.

mod fixtures {
    include!("fixtures.rs");
}

use fixtures::OUTER;
use pbwire::{Buffer, Entry, Error, Field, Message, Value};

/// Field 1 = 127 grows to 128 in place: the payload gains a byte and the
/// journal records (1, 2, +1).
#[test]
fn varint_update_grows_in_place() {
    let mut buf = Buffer::copy_from(&[0x08, 0x7F]);
    let msg = Message::create(&OUTER, &buf);

    let mut field = Field::create(&msg, &mut buf, 1).unwrap();
    assert_eq!(field.get(&buf).unwrap(), Value::Uint32(127));

    field.put(&mut buf, &Value::Uint32(128)).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x80, 0x01]);
    assert_eq!(
        buf.journal().entries(),
        &[Entry {
            origin: 1,
            offset: 2,
            delta: 1
        }]
    );
    assert_eq!(field.get(&buf).unwrap(), Value::Uint32(128));
}

/// Writing a payload of unchanged size appends no journal entry; only a
/// size change does.
#[test]
fn write_idempotence_on_shape() {
    let mut buf = Buffer::copy_from(&[0x08, 0x7F]);
    let msg = Message::create(&OUTER, &buf);
    let mut field = Field::create(&msg, &mut buf, 1).unwrap();

    field.put(&mut buf, &Value::Uint32(127)).unwrap();
    assert_eq!(buf.version(), 0);
    field.put(&mut buf, &Value::Uint32(100)).unwrap();
    assert_eq!(buf.version(), 0);
    assert_eq!(buf.data(), &[0x08, 0x64]);

    field.put(&mut buf, &Value::Uint32(300)).unwrap();
    assert_eq!(buf.version(), 1);
    field.put(&mut buf, &Value::Uint32(300)).unwrap();
    assert_eq!(buf.version(), 1);
}

/// A zero-copy buffer accepts same-size overwrites and refuses growth
/// with `ALLOC`, leaving the bytes untouched.
#[test]
fn zero_copy_size_is_immutable() {
    let mut bytes = [0x08, 0x7F];
    let mut buf = Buffer::zero_copy(&mut bytes);
    let msg = Message::create(&OUTER, &buf);
    let mut field = Field::create(&msg, &mut buf, 1).unwrap();

    field.put(&mut buf, &Value::Uint32(100)).unwrap();
    assert_eq!(buf.data(), &[0x08, 0x64]);

    assert_eq!(field.put(&mut buf, &Value::Uint32(128)), Err(Error::Alloc));
    assert_eq!(buf.data(), &[0x08, 0x64]);
    assert_eq!(buf.version(), 0);
}

/// String payloads re-encode their length prefix when it changes size
/// (crossing the 127-byte boundary).
#[test]
fn string_prefix_reencodes_across_boundary() {
    let mut buf = Buffer::copy_from(&[0x42, 0x02, b'h', b'i']);
    let msg = Message::create(&OUTER, &buf);
    let mut field = Field::create(&msg, &mut buf, 8).unwrap();

    let long = "x".repeat(130);
    field.put(&mut buf, &Value::String(&long)).unwrap();
    assert_eq!(buf.len(), 1 + 2 + 130);
    assert_eq!(&buf.data()[..3], &[0x42, 0x82, 0x01]);
    assert_eq!(field.get(&buf).unwrap(), Value::String(&long));

    field.put(&mut buf, &Value::String("ok")).unwrap();
    assert_eq!(buf.data(), &[0x42, 0x02, b'o', b'k']);
}

/// matches() encodes the probe the way put() would and compares bytes.
#[test]
fn field_matches_by_encoding() {
    let mut buf = Buffer::copy_from(&[0x18, 0x01]); // sint32 = -1 zig-zagged
    let msg = Message::create(&OUTER, &buf);
    let field = Field::create(&msg, &mut buf, 3).unwrap();

    assert_eq!(field.matches(&buf, &Value::Sint32(-1)), Ok(true));
    assert_eq!(field.matches(&buf, &Value::Sint32(1)), Ok(false));
    assert_eq!(
        field.matches(&buf, &Value::Uint32(1)),
        Err(Error::Descriptor)
    );
}

/// The raw escape hatch exposes fixed-width payload bytes for in-place
/// edits, and only those.
#[test]
fn raw_access_to_fixed_payload() {
    let mut buf = Buffer::copy_from(&[0x2D, 0x01, 0x00, 0x00, 0x00]);
    let msg = Message::create(&OUTER, &buf);
    let mut field = Field::create(&msg, &mut buf, 5).unwrap();

    {
        let raw = field.raw(&mut buf).unwrap();
        raw.copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    }
    assert_eq!(field.get(&buf).unwrap(), Value::Fixed32(0xDEAD_BEEF));
    assert_eq!(buf.version(), 0);

    let mut varint_field = Field::create(&msg, &mut buf, 1).unwrap();
    assert_eq!(varint_field.raw(&mut buf), Err(Error::Descriptor));
}

/// An absent field with a schema default is synthetic: reads see the
/// default, the buffer stays untouched until the first write.
#[test]
fn synthetic_default_materializes_on_put() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);

    let mut field = Field::create(&msg, &mut buf, 4).unwrap();
    assert!(field.is_synthetic());
    assert!(buf.is_empty());
    assert_eq!(field.get(&buf).unwrap(), Value::Bool(true));
    assert_eq!(field.matches(&buf, &Value::Bool(true)), Ok(true));

    field.put(&mut buf, &Value::Bool(false)).unwrap();
    assert!(!field.is_synthetic());
    assert_eq!(buf.data(), &[0x20, 0x00]);
    assert_eq!(field.get(&buf).unwrap(), Value::Bool(false));
}

/// Without default materialization, an absent field is created empty in
/// the buffer and decodes as absent until written.
#[test]
fn create_without_default_appends_empty() {
    let mut buf = Buffer::empty();
    let msg = Message::create(&OUTER, &buf);

    let mut field = Field::create_without_default(&msg, &mut buf, 4).unwrap();
    assert!(!field.is_synthetic());
    assert_eq!(buf.data(), &[0x20]);
    assert_eq!(field.get(&buf), Err(Error::Absent));

    field.put(&mut buf, &Value::Bool(true)).unwrap();
    assert_eq!(buf.data(), &[0x20, 0x01]);
}

/// Clearing a field removes header and payload; clearing again fails
/// with `INVALID` and changes nothing.
#[test]
fn clear_is_sticky() {
    let mut buf = Buffer::copy_from(&[0x08, 0x07, 0x10, 0x2A]);
    let msg = Message::create(&OUTER, &buf);
    let mut field = Field::create(&msg, &mut buf, 1).unwrap();

    field.clear(&mut buf).unwrap();
    assert_eq!(buf.data(), &[0x10, 0x2A]);
    assert!(!field.is_valid());
    assert_eq!(field.clear(&mut buf), Err(Error::Invalid));
    assert_eq!(buf.data(), &[0x10, 0x2A]);
}

/// Unknown tags are a schema error at creation time.
#[test]
fn unknown_tag_is_descriptor_error() {
    let mut buf = Buffer::copy_from(&[0x08, 0x01]);
    let msg = Message::create(&OUTER, &buf);
    assert!(matches!(
        Field::create(&msg, &mut buf, 99),
        Err(Error::Descriptor)
    ));
}
