use crate::coding::{Decode, DecodeError, Encode};

use super::{ControlType, Message};

/// RequestsBlocked (0x1a): the peer wants a request id above our limit.
///
/// Informational; logged but never fatal.
#[derive(Clone, Debug)]
pub struct RequestsBlocked {
	pub maximum_request_id: u64,
}

impl Message for RequestsBlocked {
	const TYPE: ControlType = ControlType::RequestsBlocked;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.maximum_request_id.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Self {
			maximum_request_id: u64::decode(buf)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn round_trip() {
		let msg = RequestsBlocked {
			maximum_request_id: 0,
		};

		let mut buf = BytesMut::new();
		Message::encode(&msg, &mut buf);
		let mut data = buf.freeze();
		let decoded = RequestsBlocked::decode(&mut data).unwrap();

		assert_eq!(decoded.maximum_request_id, 0);
	}
}
