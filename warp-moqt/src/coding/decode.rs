use bytes::{Buf, Bytes};

pub trait Decode: Sized {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

/// A decode error at the wire layer.
///
/// `Short` means the buffer ended mid-field; stream readers treat it as
/// "need more data" and only surface it when the stream itself ends.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
	#[error("short read")]
	Short,

	#[error("varint overflow")]
	Overflow,

	#[error("invalid value")]
	InvalidValue,

	#[error("unknown message type: 0x{0:x}")]
	UnknownType(u64),

	#[error("trailing bytes")]
	TooManyBytes,

	#[error("invalid string")]
	InvalidString,
}

impl Decode for u8 {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		if buf.remaining() < 1 {
			return Err(DecodeError::Short);
		}
		Ok(buf.get_u8())
	}
}

// Fixed-width, big-endian. Used for control message lengths.
impl Decode for u16 {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		if buf.remaining() < 2 {
			return Err(DecodeError::Short);
		}
		Ok(buf.get_u16())
	}
}

impl Decode for String {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let data = Bytes::decode(buf)?;
		String::from_utf8(data.to_vec()).map_err(|_| DecodeError::InvalidString)
	}
}

impl Decode for Bytes {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let size = usize::decode(buf)?;
		if buf.remaining() < size {
			return Err(DecodeError::Short);
		}
		Ok(buf.copy_to_bytes(size))
	}
}

impl Decode for Vec<u8> {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Bytes::decode(buf)?.to_vec())
	}
}
