use crate::coding::{Decode, DecodeError, Encode};

use super::{ControlType, Message};

/// GoAway (0x10): the server asks us to migrate to a new session URI.
#[derive(Clone, Debug)]
pub struct GoAway {
	pub new_session_uri: String,
}

impl Message for GoAway {
	const TYPE: ControlType = ControlType::GoAway;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.new_session_uri.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Self {
			new_session_uri: String::decode(buf)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn round_trip() {
		let msg = GoAway {
			new_session_uri: "https://example.com/relay2".to_string(),
		};

		let mut buf = BytesMut::new();
		Message::encode(&msg, &mut buf);
		let mut data = buf.freeze();
		let decoded = GoAway::decode(&mut data).unwrap();

		assert_eq!(decoded.new_session_uri, "https://example.com/relay2");
	}

	#[test]
	fn empty_uri() {
		let msg = GoAway {
			new_session_uri: String::new(),
		};

		let mut buf = BytesMut::new();
		Message::encode(&msg, &mut buf);
		let mut data = buf.freeze();
		let decoded = GoAway::decode(&mut data).unwrap();

		assert_eq!(decoded.new_session_uri, "");
	}
}
