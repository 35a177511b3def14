// pbwire — in-place editing of protobuf wire-format buffers.

pub mod alloc;
pub mod buffer;
pub mod cursor;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod journal;
pub mod message;
pub mod part;
pub mod stream;
pub mod types;
pub mod varint;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the primary API entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// Failure codes shared by every operation.
pub use error::Error;

/// Byte storage: owned, zero-copy, or the invalid sentinel.
pub use buffer::Buffer;

/// Allocation hooks; `Allocator::system()` wraps the platform allocator.
pub use alloc::Allocator;

/// The edit log attached to every owned buffer.
pub use journal::{Entry, Journal};

/// Versioned region anchor underlying fields, messages, and cursors.
pub use part::{Diff, Offset, Part, Version};

/// Advancing typed reader over buffer bytes.
pub use stream::Stream;

/// Message-level operations: sub-messages, lookup, erase, validation.
pub use message::Message;

/// Typed accessor for one field occurrence.
pub use field::Field;

/// Forward iteration over a message's fields, packed runs expanded.
pub use cursor::Cursor;

/// Static schema tables consumed by the core.
pub use descriptor::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FieldValue, MessageDescriptor,
    OneofDescriptor, Refer,
};

/// Wire-level vocabulary: wire types, schema types, labels, values.
pub use types::{Label, Type, Value, WireType};

// ─────────────────────────────────────────────────────────────────────────────
// Version API
// ─────────────────────────────────────────────────────────────────────────────

pub const PBWIRE_VERSION_MAJOR: i32 = 1;
pub const PBWIRE_VERSION_MINOR: i32 = 0;
pub const PBWIRE_VERSION_RELEASE: i32 = 0;
pub const PBWIRE_VERSION_NUMBER: i32 =
    PBWIRE_VERSION_MAJOR * 100 * 100 + PBWIRE_VERSION_MINOR * 100 + PBWIRE_VERSION_RELEASE;
pub const PBWIRE_VERSION_STRING: &str = "1.0.0";

/// Returns the library version number (e.g. 10000 for v1.0.0).
pub fn version_number() -> i32 {
    PBWIRE_VERSION_NUMBER
}

/// Returns the library version string (e.g. `"1.0.0"`).
pub fn version_string() -> &'static str {
    PBWIRE_VERSION_STRING
}
