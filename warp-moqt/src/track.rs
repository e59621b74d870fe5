use tokio::sync::mpsc;

use crate::coding::TrackNamespace;
use crate::{Error, Object};

/// A track requested from the publisher.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Track {
	pub namespace: TrackNamespace,
	pub name: String,
	pub priority: u8,
}

impl Track {
	pub fn new(namespace: TrackNamespace, name: &str) -> Self {
		Self {
			namespace,
			name: name.to_string(),
			priority: 128,
		}
	}
}

pub(crate) enum TrackSignal {
	Object(Object),
	End(String),
	Failed(Error),
}

/// The session-side half of a subscription: objects in, one terminal out.
pub(crate) struct TrackProducer {
	tx: mpsc::UnboundedSender<TrackSignal>,
	finished: bool,
}

impl TrackProducer {
	pub fn object(&self, object: Object) {
		if !self.finished {
			self.tx.send(TrackSignal::Object(object)).ok();
		}
	}

	/// Clean end of the subscription. At most one terminal is ever sent.
	pub fn end(&mut self, reason: &str) {
		if !self.finished {
			self.finished = true;
			self.tx.send(TrackSignal::End(reason.to_string())).ok();
		}
	}

	pub fn fail(&mut self, err: Error) {
		if !self.finished {
			self.finished = true;
			self.tx.send(TrackSignal::Failed(err)).ok();
		}
	}
}

/// The subscriber's half of a subscription.
///
/// Objects arrive in the order the session received them. After the final
/// object the consumer observes exactly one terminal: a clean end
/// (`Ok(None)`) or an error.
#[derive(Debug)]
pub struct TrackConsumer {
	pub info: Track,
	pub request_id: u64,
	pub track_alias: u64,

	rx: mpsc::UnboundedReceiver<TrackSignal>,
	terminal: Option<Result<String, Error>>,
}

impl TrackConsumer {
	pub(crate) fn pair(info: Track, request_id: u64, track_alias: u64) -> (TrackProducer, Self) {
		let (tx, rx) = mpsc::unbounded_channel();

		let producer = TrackProducer { tx, finished: false };
		let consumer = Self {
			info,
			request_id,
			track_alias,
			rx,
			terminal: None,
		};

		(producer, consumer)
	}

	/// The next object, or `Ok(None)` once the subscription ended cleanly.
	pub async fn next_object(&mut self) -> Result<Option<Object>, Error> {
		if let Some(terminal) = &self.terminal {
			return match terminal {
				Ok(_) => Ok(None),
				Err(err) => Err(err.clone()),
			};
		}

		match self.rx.recv().await {
			Some(TrackSignal::Object(object)) => Ok(Some(object)),
			Some(TrackSignal::End(reason)) => {
				self.terminal = Some(Ok(reason));
				Ok(None)
			}
			Some(TrackSignal::Failed(err)) => {
				self.terminal = Some(Err(err.clone()));
				Err(err)
			}
			// The session dropped the producer without a terminal.
			None => {
				self.terminal = Some(Err(Error::Closed));
				Err(Error::Closed)
			}
		}
	}

	/// Why the subscription ended, once it has.
	pub fn end_reason(&self) -> Option<&str> {
		match &self.terminal {
			Some(Ok(reason)) => Some(reason),
			_ => None,
		}
	}
}
