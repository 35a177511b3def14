//! Error codes shared by every component of the crate.
//!
//! All fallible operations return `Result<_, Error>`; success is the `Ok`
//! arm, so there is no "no error" variant. Constructors that cannot fail
//! by returning `Result` (buffers, parts, cursors) instead produce an
//! *invalid* instance whose error is observable through a query accessor.

use core::fmt;

/// Failure codes, one per cause class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The allocator returned null, the buffer cannot resize (zero-copy),
    /// or the operation targeted an invalid buffer.
    Alloc,
    /// The part, message, field, or cursor became unreachable after a
    /// journaled mutation, or was never reachable.
    Invalid,
    /// Out-of-range index, or a cursor walked past the end of its region.
    Offset,
    /// Malformed varint: truncated, or longer than the 10-byte budget.
    Varint,
    /// A length-delimited value declared more bytes than remain.
    Underrun,
    /// The fixed-size staging area for scalar encoding overflowed.
    Overflow,
    /// Schema mismatch: wrong wire type, or an unknown tag where the
    /// descriptor is required.
    Descriptor,
    /// A required field is missing and no default is available.
    Absent,
}

impl Error {
    /// Human-readable description of the failure class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::Alloc => "allocation failed",
            Error::Invalid => "object is invalid",
            Error::Offset => "offset out of range",
            Error::Varint => "malformed varint",
            Error::Underrun => "length prefix exceeds remaining bytes",
            Error::Overflow => "staging buffer overflow",
            Error::Descriptor => "schema mismatch",
            Error::Absent => "value is absent",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_distinct() {
        let all = [
            Error::Alloc,
            Error::Invalid,
            Error::Offset,
            Error::Varint,
            Error::Underrun,
            Error::Overflow,
            Error::Descriptor,
            Error::Absent,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(Error::Varint.to_string(), Error::Varint.as_str());
    }
}
