use crate::coding::{Decode, DecodeError, Encode};

use super::{ControlType, Message, Parameters, PARAM_MAX_REQUEST_ID};

/// The protocol version this client speaks: draft-14.
pub const VERSION_DRAFT_14: u64 = 0xff00000e;

/// ClientSetup (0x20): offered versions and client parameters.
#[derive(Clone, Debug)]
pub struct ClientSetup {
	pub versions: Vec<u64>,
	pub params: Parameters,
}

impl ClientSetup {
	pub fn new(max_request_id: u64) -> Self {
		let mut params = Parameters::default();
		params.set_varint(PARAM_MAX_REQUEST_ID, max_request_id);

		Self {
			versions: vec![VERSION_DRAFT_14],
			params,
		}
	}
}

impl Message for ClientSetup {
	const TYPE: ControlType = ControlType::ClientSetup;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.versions.len().encode(w);
		for version in &self.versions {
			version.encode(w);
		}
		self.params.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let count = usize::decode(buf)?;

		let mut versions = Vec::with_capacity(count.min(8));
		for _ in 0..count {
			versions.push(u64::decode(buf)?);
		}

		let params = Parameters::decode(buf)?;
		Ok(Self { versions, params })
	}
}

/// ServerSetup (0x21): the selected version and server parameters.
#[derive(Clone, Debug)]
pub struct ServerSetup {
	pub version: u64,
	pub params: Parameters,
}

impl Message for ServerSetup {
	const TYPE: ControlType = ControlType::ServerSetup;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.version.encode(w);
		self.params.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let version = u64::decode(buf)?;
		let params = Parameters::decode(buf)?;
		Ok(Self { version, params })
	}
}
