use crate::coding::{Decode, DecodeError, Encode};

/// The header of an inbound unidirectional object stream.
///
/// On the wire the header is preceded by the stream type varint
/// ([`SubgroupHeader::STREAM_TYPE`]); objects follow until EOF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubgroupHeader {
	pub track_alias: u64,
	pub group_id: u64,
	pub subgroup_id: u64,
	pub publisher_priority: u8,
}

impl SubgroupHeader {
	pub const STREAM_TYPE: u64 = 0x04;
}

impl Encode for SubgroupHeader {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.track_alias.encode(w);
		self.group_id.encode(w);
		self.subgroup_id.encode(w);
		self.publisher_priority.encode(w);
	}
}

impl Decode for SubgroupHeader {
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Self {
			track_alias: u64::decode(buf)?,
			group_id: u64::decode(buf)?,
			subgroup_id: u64::decode(buf)?,
			publisher_priority: u8::decode(buf)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn round_trip() {
		let header = SubgroupHeader {
			track_alias: 7,
			group_id: 0,
			subgroup_id: 0,
			publisher_priority: 128,
		};

		let mut buf = BytesMut::new();
		header.encode(&mut buf);
		assert_eq!(buf.as_ref(), &[0x07, 0x00, 0x00, 0x80]);

		let mut data = buf.freeze();
		assert_eq!(SubgroupHeader::decode(&mut data).unwrap(), header);
	}
}
