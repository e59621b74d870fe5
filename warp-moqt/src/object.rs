use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Object status, carried on the wire only when the payload is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum ObjectStatus {
	#[default]
	Normal = 0x0,
	DoesNotExist = 0x1,
	EndOfGroup = 0x3,
	EndOfTrack = 0x4,
}

/// A single object received on a subgroup stream.
///
/// `(track_alias, group_id, object_id)` identifies the object; object ids
/// are monotone non-decreasing within one subgroup stream.
#[derive(Clone, Debug)]
pub struct Object {
	pub track_alias: u64,
	pub group_id: u64,
	pub subgroup_id: u64,
	pub object_id: u64,
	pub publisher_priority: u8,
	pub extensions: Option<Bytes>,
	pub status: ObjectStatus,
	pub payload: Bytes,
}
