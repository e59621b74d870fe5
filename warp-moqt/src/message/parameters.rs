use bytes::Bytes;

use crate::coding::{Decode, DecodeError, Encode};

/// Setup parameter: the largest request id the sender will accept.
pub const PARAM_MAX_REQUEST_ID: u64 = 0x02;

/// Setup parameter: the WebTransport path, unused over raw QUIC.
pub const PARAM_PATH: u64 = 0x01;

/// A key/value parameter list.
///
/// Unknown parameters are preserved verbatim; their varint length prefix is
/// enough to skip them without understanding the contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parameters(Vec<(u64, Bytes)>);

impl Parameters {
	pub fn set(&mut self, id: u64, value: Bytes) {
		self.0.retain(|(k, _)| *k != id);
		self.0.push((id, value));
	}

	/// Set a parameter whose value is a single varint.
	pub fn set_varint(&mut self, id: u64, value: u64) {
		let mut buf = Vec::new();
		value.encode(&mut buf);
		self.set(id, buf.into());
	}

	pub fn get(&self, id: u64) -> Option<&Bytes> {
		self.0.iter().find(|(k, _)| *k == id).map(|(_, v)| v)
	}

	pub fn get_varint(&self, id: u64) -> Option<u64> {
		let mut buf = self.get(id)?.clone();
		u64::decode(&mut buf).ok()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Encode for Parameters {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.0.len().encode(w);
		for (id, value) in &self.0 {
			id.encode(w);
			value.encode(w);
		}
	}
}

impl Decode for Parameters {
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let count = usize::decode(buf)?;

		let mut params = Vec::new();
		for _ in 0..count {
			let id = u64::decode(buf)?;
			let value = Bytes::decode(buf)?;
			params.push((id, value));
		}

		Ok(Self(params))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::{Buf, BytesMut};

	#[test]
	fn round_trip() {
		let mut params = Parameters::default();
		params.set_varint(PARAM_MAX_REQUEST_ID, 100);
		params.set(0x77, Bytes::from_static(b"opaque"));

		let mut buf = BytesMut::new();
		params.encode(&mut buf);

		let mut data = buf.freeze();
		let decoded = Parameters::decode(&mut data).unwrap();

		assert_eq!(decoded.get_varint(PARAM_MAX_REQUEST_ID), Some(100));
		assert_eq!(decoded.get(0x77).unwrap().as_ref(), b"opaque");
	}

	#[test]
	fn unknown_parameters_are_skipped() {
		// Two parameters we have no handler for, then a known one.
		let mut buf = BytesMut::new();
		3usize.encode(&mut buf);
		0x99u64.encode(&mut buf);
		Bytes::from_static(&[1, 2, 3]).encode(&mut buf);
		0x9au64.encode(&mut buf);
		Bytes::new().encode(&mut buf);
		PARAM_MAX_REQUEST_ID.encode(&mut buf);
		Bytes::from_static(&[0x32]).encode(&mut buf);

		let mut data = buf.freeze();
		let decoded = Parameters::decode(&mut data).unwrap();

		assert!(!data.has_remaining());
		assert_eq!(decoded.get_varint(PARAM_MAX_REQUEST_ID), Some(50));
	}
}
