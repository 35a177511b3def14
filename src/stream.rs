//! Advancing read over buffer bytes.
//!
//! A stream is a byte offset plus a borrowed view of the buffer contents;
//! it decodes typed values moving forward and can skip a value of any
//! wire type without decoding it. Streams never mutate.

use crate::buffer::Buffer;
use crate::error::Error;
use crate::types::{Type, Value, WireType};
use crate::varint;

/// Read cursor over a buffer's bytes.
#[derive(Debug, Clone)]
pub struct Stream<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Stream<'a> {
    /// Stream over `buffer` starting at the first byte.
    pub fn new(buffer: &'a Buffer<'_>) -> Stream<'a> {
        Stream::at(buffer, 0)
    }

    /// Stream over `buffer` starting at byte `offset`.
    pub fn at(buffer: &'a Buffer<'_>, offset: usize) -> Stream<'a> {
        Stream {
            bytes: buffer.data(),
            offset,
        }
    }

    pub(crate) fn over(bytes: &'a [u8], offset: usize) -> Stream<'a> {
        Stream { bytes, offset }
    }

    /// Current byte position.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes remaining ahead of the position.
    #[inline]
    pub fn left(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    #[inline]
    fn ahead(&self) -> &'a [u8] {
        &self.bytes[self.offset.min(self.bytes.len())..]
    }

    /// Move forward `n` bytes.
    pub fn advance(&mut self, n: usize) -> Result<(), Error> {
        if self.left() < n {
            return Err(Error::Offset);
        }
        self.offset += n;
        Ok(())
    }

    /// Decode a raw varint at the position.
    ///
    /// A clean end-of-stream reports `OFFSET`; bytes that start but do
    /// not terminate a varint report `VARINT`.
    pub fn read_varint(&mut self) -> Result<u64, Error> {
        let ahead = self.ahead();
        if ahead.is_empty() {
            return Err(Error::Offset);
        }
        match varint::unpack64(ahead) {
            Some((value, used)) => {
                self.offset += used;
                Ok(value)
            }
            None => Err(Error::Varint),
        }
    }

    /// Decode one value of schema type `typ` at the position.
    ///
    /// Fixed-width values consume exactly 4 or 8 bytes (wire order is
    /// little-endian). Length-delimited values read the prefix varint and
    /// borrow the payload; a prefix pointing past the end is `OFFSET`.
    pub fn read(&mut self, typ: Type) -> Result<Value<'a>, Error> {
        match typ.wire_type() {
            WireType::Varint => {
                let ahead = self.ahead();
                if ahead.is_empty() {
                    return Err(Error::Offset);
                }
                let (value, used) = varint::unpack(typ, ahead).ok_or(Error::Varint)?;
                self.offset += used;
                Ok(value)
            }
            WireType::Bit32 | WireType::Bit64 => {
                let width = if typ.wire_type() == WireType::Bit32 { 4 } else { 8 };
                let ahead = self.ahead();
                if ahead.len() < width {
                    return Err(Error::Offset);
                }
                let (value, used) = varint::unpack(typ, &ahead[..width]).ok_or(Error::Varint)?;
                self.offset += used;
                Ok(value)
            }
            WireType::Length => {
                let len = self.read_varint()? as usize;
                if self.left() < len {
                    return Err(Error::Offset);
                }
                let payload = &self.bytes[self.offset..self.offset + len];
                // Strings must hold UTF-8 to be borrowed as str.
                let (value, _) = varint::unpack(typ, payload).ok_or(Error::Descriptor)?;
                self.offset += len;
                Ok(value)
            }
        }
    }

    /// Advance past one value of the given wire type without decoding.
    pub fn skip(&mut self, wire: WireType) -> Result<(), Error> {
        match wire {
            WireType::Varint => {
                let ahead = self.ahead();
                if ahead.is_empty() {
                    return Err(Error::Offset);
                }
                match varint::unpack64(ahead) {
                    Some((_, used)) => {
                        self.offset += used;
                        Ok(())
                    }
                    None => Err(Error::Varint),
                }
            }
            WireType::Bit32 => self.advance(4),
            WireType::Bit64 => self.advance(8),
            WireType::Length => {
                let len = self.read_varint()? as usize;
                self.advance(len)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_bounds() {
        let buf = Buffer::copy_from(&[1, 2, 3]);
        let mut stream = Stream::new(&buf);
        stream.advance(2).unwrap();
        assert_eq!(stream.offset(), 2);
        assert_eq!(stream.left(), 1);
        assert_eq!(stream.advance(2), Err(Error::Offset));
        assert_eq!(stream.offset(), 2);
    }

    #[test]
    fn read_varint_values() {
        let buf = Buffer::copy_from(&[0x7F, 0x80, 0x94, 0xEB, 0xDC, 0x03]);
        let mut stream = Stream::new(&buf);
        assert_eq!(stream.read(Type::Uint32).unwrap(), Value::Uint32(127));
        assert_eq!(
            stream.read(Type::Uint32).unwrap(),
            Value::Uint32(1_000_000_000)
        );
        assert_eq!(stream.read(Type::Uint32), Err(Error::Offset));
    }

    #[test]
    fn read_fixed_little_endian() {
        let buf = Buffer::copy_from(&[0x01, 0x00, 0x00, 0x00, 0xFF]);
        let mut stream = Stream::new(&buf);
        assert_eq!(stream.read(Type::Fixed32).unwrap(), Value::Fixed32(1));
        // Only one byte left for a four-byte read.
        assert_eq!(stream.read(Type::Fixed32), Err(Error::Offset));
    }

    #[test]
    fn read_length_delimited() {
        let buf = Buffer::copy_from(&[0x03, b'a', b'b', b'c', 0x05, b'x']);
        let mut stream = Stream::new(&buf);
        assert_eq!(stream.read(Type::String).unwrap(), Value::String("abc"));
        // Declared five bytes, one remains.
        assert_eq!(stream.read(Type::Bytes), Err(Error::Offset));
    }

    #[test]
    fn skip_by_wire_type() {
        let buf = Buffer::copy_from(&[
            0x80, 0x01, // varint
            0x02, 0xAA, 0xBB, // length-delimited
            0x01, 0x02, 0x03, 0x04, // 32-bit
        ]);
        let mut stream = Stream::new(&buf);
        stream.skip(WireType::Varint).unwrap();
        assert_eq!(stream.offset(), 2);
        stream.skip(WireType::Length).unwrap();
        assert_eq!(stream.offset(), 5);
        stream.skip(WireType::Bit32).unwrap();
        assert_eq!(stream.left(), 0);
    }

    #[test]
    fn skip_malformed_varint() {
        let buf = Buffer::copy_from(&[0x80, 0x80]);
        let mut stream = Stream::new(&buf);
        assert_eq!(stream.skip(WireType::Varint), Err(Error::Varint));
    }

    #[test]
    fn stream_at_offset() {
        let buf = Buffer::copy_from(&[9, 9, 0x08]);
        let mut stream = Stream::at(&buf, 2);
        assert_eq!(stream.read_varint().unwrap(), 8);
        assert_eq!(stream.read_varint(), Err(Error::Offset));
    }
}
