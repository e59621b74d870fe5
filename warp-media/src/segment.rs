use std::time::Duration;

use bytes::Bytes;

/// A timed CMAF segment ready for a playout sink.
#[derive(Clone, Debug)]
pub struct Segment {
	/// The catalog name of the track this segment belongs to.
	pub track: String,

	/// Whether this is the initialization segment (ftyp + moov).
	pub init: bool,

	/// The raw ISO-BMFF bytes, appendable as-is.
	pub payload: Bytes,

	/// Earliest decode time of the fragment, per `tfdt`.
	pub decode_time: Duration,

	/// Sum of the fragment's sample durations.
	pub duration: Duration,

	/// Wall-clock presentation time as an offset from the UNIX epoch, when
	/// the producer anchors its timestamps there.
	pub presentation_time: Option<Duration>,
}
