use std::fmt;

use bytes::Bytes;

use super::{Decode, DecodeError, Encode};

/// A track namespace: an ordered tuple of byte strings.
///
/// Encoded as a varint field count followed by length-prefixed fields.
/// Fields are usually UTF-8 path segments but the wire allows raw bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TrackNamespace {
	pub fields: Vec<Bytes>,
}

impl TrackNamespace {
	pub const MAX_FIELDS: usize = 32;

	pub fn new(fields: Vec<Bytes>) -> Self {
		Self { fields }
	}

	/// Split a `/`-separated path into namespace fields.
	pub fn from_utf8_path(path: &str) -> Self {
		Self {
			fields: path
				.split('/')
				.filter(|part| !part.is_empty())
				.map(|part| Bytes::copy_from_slice(part.as_bytes()))
				.collect(),
		}
	}

	pub fn to_utf8_path(&self) -> String {
		self.fields
			.iter()
			.map(|field| String::from_utf8_lossy(field).into_owned())
			.collect::<Vec<_>>()
			.join("/")
	}
}

impl Decode for TrackNamespace {
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let count = usize::decode(buf)?;
		if count > Self::MAX_FIELDS {
			return Err(DecodeError::InvalidValue);
		}

		let mut fields = Vec::with_capacity(count);
		for _ in 0..count {
			fields.push(Bytes::decode(buf)?);
		}

		Ok(Self { fields })
	}
}

impl Encode for TrackNamespace {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.fields.len().encode(w);
		for field in &self.fields {
			field.encode(w);
		}
	}
}

impl fmt::Debug for TrackNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{self}")
	}
}

impl fmt::Display for TrackNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_utf8_path())
	}
}

impl From<&str> for TrackNamespace {
	fn from(path: &str) -> Self {
		Self::from_utf8_path(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn round_trip() {
		let ns = TrackNamespace::from_utf8_path("live/room123");

		let mut buf = BytesMut::new();
		ns.encode(&mut buf);

		let mut data = buf.freeze();
		let decoded = TrackNamespace::decode(&mut data).unwrap();

		assert_eq!(decoded, ns);
		assert_eq!(decoded.to_utf8_path(), "live/room123");
	}

	#[test]
	fn empty() {
		let ns = TrackNamespace::default();

		let mut buf = BytesMut::new();
		ns.encode(&mut buf);
		assert_eq!(buf.as_ref(), &[0x00]);

		let mut data = buf.freeze();
		assert_eq!(TrackNamespace::decode(&mut data).unwrap(), ns);
	}

	#[test]
	fn rejects_oversized_tuple() {
		let mut buf = BytesMut::new();
		(TrackNamespace::MAX_FIELDS + 1).encode(&mut buf);

		let mut data = buf.freeze();
		assert_eq!(
			TrackNamespace::decode(&mut data),
			Err(DecodeError::InvalidValue)
		);
	}
}
