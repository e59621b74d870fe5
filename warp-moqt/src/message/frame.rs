use bytes::{Buf, BufMut, Bytes};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::coding::{Decode, DecodeError, Encode};

/// Control message type codes (draft-14).
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum ControlType {
	Subscribe = 0x03,
	SubscribeOk = 0x04,
	SubscribeError = 0x05,
	Unsubscribe = 0x0a,
	SubscribeDone = 0x0b,
	GoAway = 0x10,
	RequestsBlocked = 0x1a,
	ClientSetup = 0x20,
	ServerSetup = 0x21,
}

impl Encode for ControlType {
	fn encode<W: BufMut>(&self, w: &mut W) {
		u64::from(*self).encode(w)
	}
}

/// The payload codec for a single control message type.
pub trait Message: Sized {
	const TYPE: ControlType;

	fn encode<W: BufMut>(&self, w: &mut W);
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

/// Frame a control message: type, u16 BE payload length, payload.
pub fn encode_frame<M: Message>(msg: &M, out: &mut Vec<u8>) {
	M::TYPE.encode(out);

	let mut payload = Vec::new();
	msg.encode(&mut payload);

	let size: u16 = payload.len().try_into().expect("control message too large");
	size.encode(out);
	out.extend_from_slice(&payload);
}

/// Decode a message from an exact-length payload, rejecting leftovers.
pub fn decode_payload<M: Message>(payload: Bytes) -> Result<M, DecodeError> {
	let mut buf = payload;
	let msg = M::decode(&mut buf)?;
	if buf.has_remaining() {
		return Err(DecodeError::TooManyBytes);
	}
	Ok(msg)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::message::Unsubscribe;

	#[test]
	fn frame_layout() {
		let msg = Unsubscribe { request_id: 8 };

		let mut buf = Vec::new();
		encode_frame(&msg, &mut buf);

		// type 0x0a, length 0x0001 big-endian, payload varint 8
		assert_eq!(buf, vec![0x0a, 0x00, 0x01, 0x08]);
	}

	#[test]
	fn rejects_trailing_bytes() {
		let payload = Bytes::from_static(&[0x08, 0xff]);
		let err = decode_payload::<Unsubscribe>(payload).unwrap_err();
		assert_eq!(err, DecodeError::TooManyBytes);
	}
}
