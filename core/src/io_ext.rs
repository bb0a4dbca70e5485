use byteorder::ByteOrder;
use thiserror::Error;

use ultraviolet::vec::Vec3;

/// A read that would run past the end of the underlying buffer
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("Read of {wanted} bytes at offset {offset} exceeds buffer length {len}")]
pub struct OutOfBounds {
	pub offset: usize,
	pub wanted: usize,
	pub len: usize,
}

/// Bounds-checked sequential reader over a byte buffer.
///
/// Every read advances the position and fails with [`OutOfBounds`] instead of reading past the
/// end. Format decoders convert that into their own truncation error.
#[derive(Clone, Debug)]
pub struct BinCursor<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> BinCursor<'a> {
	pub fn new(buf: &'a [u8]) -> BinCursor<'a> {
		BinCursor {
			buf: buf,
			pos: 0,
		}
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.buf.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	#[inline]
	pub fn position(&self) -> usize {
		self.pos
	}

	/// Number of bytes left between the current position and the end of the buffer
	#[inline]
	pub fn remaining(&self) -> usize {
		self.buf.len() - self.pos
	}

	/// Checks that `wanted` bytes starting at `offset` lie inside the buffer
	pub fn check(&self, offset: usize, wanted: usize) -> Result<(), OutOfBounds> {
		match offset.checked_add(wanted) {
			Some(end) if end <= self.buf.len() => Ok(()),
			_ => Err(OutOfBounds {
				offset: offset,
				wanted: wanted,
				len: self.buf.len(),
			}),
		}
	}

	/// Moves to an absolute offset. Seeking exactly to the end is allowed.
	pub fn seek(&mut self, offset: usize) -> Result<(), OutOfBounds> {
		self.check(offset, 0)?;
		self.pos = offset;
		Ok(())
	}

	pub fn skip(&mut self, n: usize) -> Result<(), OutOfBounds> {
		self.take(n).map(|_| ())
	}

	/// Returns the byte at an absolute offset without moving
	pub fn peek_byte_at(&self, offset: usize) -> Result<u8, OutOfBounds> {
		self.check(offset, 1)?;
		Ok(self.buf[offset])
	}

	/// Returns the next `n` bytes and advances past them
	pub fn take(&mut self, n: usize) -> Result<&'a [u8], OutOfBounds> {
		self.check(self.pos, n)?;
		let bytes = &self.buf[self.pos..self.pos + n];
		self.pos += n;
		Ok(bytes)
	}

	#[inline]
	pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
		Ok(self.take(1)?[0])
	}

	#[inline]
	pub fn read_u16<B: ByteOrder>(&mut self) -> Result<u16, OutOfBounds> {
		Ok(B::read_u16(self.take(2)?))
	}

	#[inline]
	pub fn read_i16<B: ByteOrder>(&mut self) -> Result<i16, OutOfBounds> {
		Ok(B::read_i16(self.take(2)?))
	}

	#[inline]
	pub fn read_u32<B: ByteOrder>(&mut self) -> Result<u32, OutOfBounds> {
		Ok(B::read_u32(self.take(4)?))
	}

	#[inline]
	pub fn read_i32<B: ByteOrder>(&mut self) -> Result<i32, OutOfBounds> {
		Ok(B::read_i32(self.take(4)?))
	}

	#[inline]
	pub fn read_f32<B: ByteOrder>(&mut self) -> Result<f32, OutOfBounds> {
		Ok(B::read_f32(self.take(4)?))
	}

	/// Reads a 3D vector of 32-bit floats
	#[inline]
	pub fn read_vec3<B: ByteOrder>(&mut self) -> Result<Vec3, OutOfBounds> {
		let bytes = self.take(12)?;

		Ok(Vec3::new(B::read_f32(&bytes[0..4]), B::read_f32(&bytes[4..8]),
			B::read_f32(&bytes[8..12])))
	}

	/// Reads a fixed-size, NUL-padded string, trimming the padding and trailing whitespace
	pub fn read_fixed_str(&mut self, n: usize) -> Result<String, OutOfBounds> {
		let bytes = self.take(n)?;
		let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
		let s: String = bytes[..end].iter().map(|b| *b as char).collect();

		Ok(s.trim_end().to_string())
	}
}

#[cfg(test)]
mod tests {
	use byteorder::{
		BE,
		LE
	};

	use ultraviolet::vec::Vec3;

	use super::*;

	#[test]
	fn test_read_scalars() {
		let data = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xff, 0xff, 0xff, 0xff];
		let mut cur = BinCursor::new(&data);

		assert_eq!(cur.read_i32::<LE>(), Ok(1));
		assert_eq!(cur.read_u32::<BE>(), Ok(2));
		assert_eq!(cur.read_i32::<LE>(), Ok(-1));
		assert_eq!(cur.remaining(), 0);
	}

	#[test]
	fn test_read_vec3() {
		let data = [0x5c, 0x1f, 0x7f, 0x3c, 0xa4, 0xfb, 0xf0, 0x3d, 0xd4, 0xf1, 0xb6, 0x3d];
		let mut cur = BinCursor::new(&data);

		assert_eq!(cur.read_vec3::<LE>(), Ok(Vec3::new(0.0155714415, 0.117667466, 0.089328438)));
	}

	#[test]
	fn test_out_of_bounds() {
		let data = [0u8; 6];
		let mut cur = BinCursor::new(&data);

		assert_eq!(cur.read_f32::<LE>(), Ok(0.0));
		assert_eq!(cur.read_i32::<LE>(), Err(OutOfBounds {
			offset: 4,
			wanted: 4,
			len: 6,
		}));
		// A failed read leaves the position untouched
		assert_eq!(cur.position(), 4);
		assert_eq!(cur.read_u16::<LE>(), Ok(0));
		assert!(cur.read_u8().is_err());
	}

	#[test]
	fn test_seek_and_peek() {
		let data = b"abcdef";
		let mut cur = BinCursor::new(&data[..]);

		assert_eq!(cur.peek_byte_at(2), Ok(b'c'));
		assert!(cur.peek_byte_at(6).is_err());
		assert!(cur.seek(6).is_ok());
		assert_eq!(cur.remaining(), 0);
		assert!(cur.seek(7).is_err());
		assert!(cur.check(usize::MAX, 2).is_err());
	}

	#[test]
	fn test_read_fixed_str() {
		let mut cur = BinCursor::new(&b"stand01 \x00\x00garbagtail"[..]);
		assert_eq!(cur.read_fixed_str(16), Ok("stand01".to_string()));
		assert_eq!(cur.read_fixed_str(4), Ok("tail".to_string()));
		assert!(cur.read_fixed_str(1).is_err());
	}
}
