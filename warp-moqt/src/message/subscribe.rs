use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::coding::{Decode, DecodeError, Encode, TrackNamespace};

use super::{ControlType, Message, Parameters};

/// Group delivery order requested by the subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum GroupOrder {
	Publisher = 0x0,
	#[default]
	Ascending = 0x1,
	Descending = 0x2,
}

/// Which objects the subscription starts (and optionally stops) at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
	/// Deliver from the latest object the publisher has (0x2). The default.
	LatestObject,
	/// Deliver from an absolute start location (0x3).
	AbsoluteStart { group: u64, object: u64 },
	/// Deliver a bounded range of groups (0x4).
	AbsoluteRange { group: u64, object: u64, end_group: u64 },
}

impl Filter {
	const LATEST_OBJECT: u64 = 0x2;
	const ABSOLUTE_START: u64 = 0x3;
	const ABSOLUTE_RANGE: u64 = 0x4;
}

impl Encode for Filter {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self {
			Self::LatestObject => Self::LATEST_OBJECT.encode(w),
			Self::AbsoluteStart { group, object } => {
				Self::ABSOLUTE_START.encode(w);
				group.encode(w);
				object.encode(w);
			}
			Self::AbsoluteRange {
				group,
				object,
				end_group,
			} => {
				Self::ABSOLUTE_RANGE.encode(w);
				group.encode(w);
				object.encode(w);
				end_group.encode(w);
			}
		}
	}
}

impl Decode for Filter {
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(match u64::decode(buf)? {
			Self::LATEST_OBJECT => Self::LatestObject,
			Self::ABSOLUTE_START => Self::AbsoluteStart {
				group: u64::decode(buf)?,
				object: u64::decode(buf)?,
			},
			Self::ABSOLUTE_RANGE => Self::AbsoluteRange {
				group: u64::decode(buf)?,
				object: u64::decode(buf)?,
				end_group: u64::decode(buf)?,
			},
			_ => return Err(DecodeError::InvalidValue),
		})
	}
}

/// Subscribe (0x03): request all matching objects for a track.
///
/// The track alias is proposed by the subscriber and scopes subsequent
/// object stream headers to this subscription.
#[derive(Clone, Debug)]
pub struct Subscribe {
	pub request_id: u64,
	pub track_alias: u64,
	pub namespace: TrackNamespace,
	pub name: String,
	pub subscriber_priority: u8,
	pub group_order: GroupOrder,
	pub filter: Filter,
	pub params: Parameters,
}

impl Message for Subscribe {
	const TYPE: ControlType = ControlType::Subscribe;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.track_alias.encode(w);
		self.namespace.encode(w);
		self.name.encode(w);
		self.subscriber_priority.encode(w);
		u8::from(self.group_order).encode(w);
		self.filter.encode(w);
		self.params.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let request_id = u64::decode(buf)?;
		let track_alias = u64::decode(buf)?;
		let namespace = TrackNamespace::decode(buf)?;
		let name = String::decode(buf)?;
		let subscriber_priority = u8::decode(buf)?;
		let group_order = u8::decode(buf)?
			.try_into()
			.map_err(|_| DecodeError::InvalidValue)?;
		let filter = Filter::decode(buf)?;
		let params = Parameters::decode(buf)?;

		Ok(Self {
			request_id,
			track_alias,
			namespace,
			name,
			subscriber_priority,
			group_order,
			filter,
			params,
		})
	}
}

/// SubscribeOk (0x04).
#[derive(Clone, Debug)]
pub struct SubscribeOk {
	pub request_id: u64,
	pub expires: u64,
	pub group_order: GroupOrder,
	/// Largest (group, object) the publisher has, when content exists.
	pub largest: Option<(u64, u64)>,
	pub params: Parameters,
}

impl Message for SubscribeOk {
	const TYPE: ControlType = ControlType::SubscribeOk;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.expires.encode(w);
		u8::from(self.group_order).encode(w);

		if let Some((group, object)) = self.largest {
			1u8.encode(w);
			group.encode(w);
			object.encode(w);
		} else {
			0u8.encode(w);
		}

		self.params.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let request_id = u64::decode(buf)?;
		let expires = u64::decode(buf)?;
		let group_order = u8::decode(buf)?
			.try_into()
			.map_err(|_| DecodeError::InvalidValue)?;

		let largest = match u8::decode(buf)? {
			0 => None,
			1 => Some((u64::decode(buf)?, u64::decode(buf)?)),
			_ => return Err(DecodeError::InvalidValue),
		};

		let params = Parameters::decode(buf)?;

		Ok(Self {
			request_id,
			expires,
			group_order,
			largest,
			params,
		})
	}
}

/// SubscribeError (0x05).
///
/// A non-zero `track_alias` suggests an alias to propose on a retry.
#[derive(Clone, Debug)]
pub struct SubscribeError {
	pub request_id: u64,
	pub code: u64,
	pub reason: String,
	pub track_alias: u64,
}

impl Message for SubscribeError {
	const TYPE: ControlType = ControlType::SubscribeError;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.code.encode(w);
		self.reason.encode(w);
		self.track_alias.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Self {
			request_id: u64::decode(buf)?,
			code: u64::decode(buf)?,
			reason: String::decode(buf)?,
			track_alias: u64::decode(buf)?,
		})
	}
}

/// SubscribeDone (0x0b): the publisher finished serving a subscription.
#[derive(Clone, Debug)]
pub struct SubscribeDone {
	pub request_id: u64,
	pub status_code: u64,
	pub stream_count: u64,
	pub reason: String,
}

impl Message for SubscribeDone {
	const TYPE: ControlType = ControlType::SubscribeDone;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.status_code.encode(w);
		self.stream_count.encode(w);
		self.reason.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Self {
			request_id: u64::decode(buf)?,
			status_code: u64::decode(buf)?,
			stream_count: u64::decode(buf)?,
			reason: String::decode(buf)?,
		})
	}
}

/// Unsubscribe (0x0a).
#[derive(Clone, Debug)]
pub struct Unsubscribe {
	pub request_id: u64,
}

impl Message for Unsubscribe {
	const TYPE: ControlType = ControlType::Unsubscribe;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
	}

	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Self {
			request_id: u64::decode(buf)?,
		})
	}
}
