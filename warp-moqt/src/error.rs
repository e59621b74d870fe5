use std::sync::Arc;

use crate::coding::DecodeError;

/// Errors surfaced by the MoQT client.
///
/// Protocol errors on the control stream are fatal and close the session;
/// the same errors on a data stream only drop that stream.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
	/// The underlying transport session failed.
	#[error("transport error: {0}")]
	Transport(Arc<dyn std::error::Error + Send + Sync>),

	/// A wire-level decode failure.
	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	/// The server selected a version we did not offer.
	#[error("unsupported version: 0x{0:x}")]
	UnsupportedVersion(u64),

	/// A setup message arrived outside the handshake, or vice versa.
	#[error("unexpected message")]
	UnexpectedMessage,

	/// A unidirectional stream started with an unknown stream type.
	#[error("unexpected stream type: 0x{0:x}")]
	UnexpectedStream(u64),

	/// The peer did not respond in time.
	#[error("timed out waiting for: {0}")]
	Timeout(&'static str),

	/// The peer rejected a subscription.
	#[error("subscribe error: code={code} reason={reason}")]
	Subscribe { code: u64, reason: String },

	/// Every even request id up to the negotiated maximum is spent.
	#[error("request ids exhausted")]
	RequestIdsExhausted,

	/// A subscription for this track already exists.
	#[error("duplicate track")]
	DuplicateTrack,

	/// An object arrived with an id lower than its predecessor.
	#[error("object order violation")]
	ObjectOrder,

	/// The operation ran after the session shut down.
	#[error("session closed")]
	Closed,
}

impl Error {
	/// The application error code used when closing streams or the session.
	pub fn to_code(&self) -> u32 {
		match self {
			Self::Transport(_) => 0x01,
			Self::Decode(_) => 0x02,
			Self::UnsupportedVersion(_) => 0x03,
			Self::UnexpectedMessage => 0x04,
			Self::UnexpectedStream(_) => 0x05,
			Self::Timeout(_) => 0x06,
			Self::Subscribe { .. } => 0x07,
			Self::RequestIdsExhausted => 0x08,
			Self::DuplicateTrack => 0x09,
			Self::ObjectOrder => 0x0a,
			Self::Closed => 0x00,
		}
	}

	pub(crate) fn transport<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
		Self::Transport(Arc::new(err))
	}
}
