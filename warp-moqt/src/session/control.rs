use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::message::{encode_frame, Message};
use crate::Error;

pub(crate) enum Command {
	Frame(Vec<u8>),
	/// Resolved once every frame queued before it has been written.
	Flush(oneshot::Sender<()>),
}

/// Queues control messages for the single writer task.
#[derive(Clone)]
pub(crate) struct Control {
	tx: mpsc::UnboundedSender<Command>,
}

impl Control {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<Command>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	pub fn send<M: Message>(&self, msg: &M) -> Result<(), Error> {
		let mut buf = Vec::new();
		encode_frame(msg, &mut buf);
		self.tx.send(Command::Frame(buf)).map_err(|_| Error::Closed)
	}

	/// Wait until prior frames hit the stream, bounded by `budget`.
	pub async fn flush(&self, budget: Duration) {
		let (tx, rx) = oneshot::channel();
		if self.tx.send(Command::Flush(tx)).is_ok() {
			tokio::time::timeout(budget, rx).await.ok();
		}
	}
}
