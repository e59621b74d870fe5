use super::{Decode, DecodeError, Encode};

/// The largest value representable as a QUIC varint: 2^62 - 1.
pub const VARINT_MAX: u64 = (1u64 << 62) - 1;

// QUIC-style variable-length integers: the two high bits of the first byte
// select a 1/2/4/8 byte encoding.
impl Decode for u64 {
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		if buf.remaining() < 1 {
			return Err(DecodeError::Short);
		}

		let first = buf.get_u8();
		let size = 1usize << (first >> 6);
		let mut value = (first & 0b0011_1111) as u64;

		if buf.remaining() < size - 1 {
			return Err(DecodeError::Short);
		}

		for _ in 1..size {
			value = (value << 8) | buf.get_u8() as u64;
		}

		Ok(value)
	}
}

impl Encode for u64 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		let v = *self;
		if v < (1 << 6) {
			w.put_u8(v as u8);
		} else if v < (1 << 14) {
			w.put_u16((0b01u16 << 14) | v as u16);
		} else if v < (1 << 30) {
			w.put_u32((0b10u32 << 30) | v as u32);
		} else if v <= VARINT_MAX {
			w.put_u64((0b11u64 << 62) | v);
		} else {
			panic!("varint overflow: {v}");
		}
	}
}

impl Decode for usize {
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		u64::decode(buf)?.try_into().map_err(|_| DecodeError::Overflow)
	}
}

impl Encode for usize {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		let v: u64 = (*self).try_into().expect("varint overflow");
		v.encode(w);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::{Bytes, BytesMut};

	fn encode(v: u64) -> Vec<u8> {
		let mut buf = BytesMut::new();
		v.encode(&mut buf);
		buf.to_vec()
	}

	fn decode(data: &[u8]) -> Result<u64, DecodeError> {
		let mut buf = Bytes::copy_from_slice(data);
		u64::decode(&mut buf)
	}

	#[test]
	fn round_trip() {
		for v in [
			0,
			1,
			63,
			64,
			16383,
			16384,
			(1 << 30) - 1,
			1 << 30,
			VARINT_MAX,
		] {
			assert_eq!(decode(&encode(v)).unwrap(), v);
		}
	}

	#[test]
	fn minimal_length() {
		assert_eq!(encode(0).len(), 1);
		assert_eq!(encode(63).len(), 1);
		assert_eq!(encode(64).len(), 2);
		assert_eq!(encode(16383).len(), 2);
		assert_eq!(encode(16384).len(), 4);
		assert_eq!(encode((1 << 30) - 1).len(), 4);
		assert_eq!(encode(1 << 30).len(), 8);
		assert_eq!(encode(VARINT_MAX).len(), 8);
	}

	#[test]
	fn known_encodings() {
		// Examples from RFC 9000 appendix A.1.
		assert_eq!(decode(&[0x25]).unwrap(), 37);
		assert_eq!(decode(&[0x7b, 0xbd]).unwrap(), 15293);
		assert_eq!(decode(&[0x9d, 0x7f, 0x3e, 0x7d]).unwrap(), 494_878_333);
		assert_eq!(
			decode(&[0xc2, 0x19, 0x7c, 0x5e, 0xff, 0x14, 0xe8, 0x8c]).unwrap(),
			151_288_809_941_952_652
		);
	}

	#[test]
	fn short_buffer() {
		assert_eq!(decode(&[]), Err(DecodeError::Short));
		assert_eq!(decode(&[0x7b]), Err(DecodeError::Short));
		assert_eq!(decode(&[0xc2, 0x19, 0x7c]), Err(DecodeError::Short));
	}

	#[test]
	#[should_panic(expected = "varint overflow")]
	fn overflow() {
		encode(VARINT_MAX + 1);
	}
}
