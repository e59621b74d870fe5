use std::time::Duration;

/// Errors from the media pipeline.
///
/// Parse failures are per-segment: the offending unit is dropped and the
/// pipeline keeps running.
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// An error from the MP4 box parsing library.
	#[error("mp4 error: {0}")]
	Mp4(#[from] mp4_atom::Error),

	/// Required MP4 box is missing.
	#[error("missing box: {0}")]
	MissingBox(mp4_atom::FourCC),

	/// Encountered an MP4 box that cannot appear here.
	#[error("unexpected box: {0}")]
	UnexpectedBox(mp4_atom::FourCC),

	/// A second initialization segment arrived.
	#[error("multiple init segments")]
	MultipleInit,

	/// A media segment arrived before the initialization segment.
	#[error("missing init segment")]
	MissingInit,

	/// A segment would rewind the buffer's decode timeline.
	#[error("out of order append: {0:?} after {1:?}")]
	OutOfOrderAppend(Duration, Duration),

	/// JSON catalog serialization/deserialization error.
	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
