//! Capability traits for the underlying WebTransport-style session.
//!
//! The client core is generic over these traits so it can run against a real
//! QUIC/WebTransport endpoint or an in-memory fake in tests. The shape
//! mirrors what a WebTransport session offers: one bidirectional stream for
//! control traffic and a source of inbound unidirectional streams.

use std::future::Future;

use bytes::{Buf, Bytes, BytesMut};

pub trait Session: Clone + Send + 'static {
	type SendStream: SendStream;
	type RecvStream: RecvStream;
	type Error: std::error::Error + Send + Sync + 'static;

	fn open_bi(&mut self) -> impl Future<Output = Result<(Self::SendStream, Self::RecvStream), Self::Error>> + Send;
	fn accept_bi(&mut self) -> impl Future<Output = Result<(Self::SendStream, Self::RecvStream), Self::Error>> + Send;
	fn open_uni(&mut self) -> impl Future<Output = Result<Self::SendStream, Self::Error>> + Send;
	fn accept_uni(&mut self) -> impl Future<Output = Result<Self::RecvStream, Self::Error>> + Send;

	fn close(&mut self, code: u32, reason: &str);
	fn closed(&self) -> impl Future<Output = Self::Error> + Send;
}

pub trait SendStream: Send + 'static {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Write some bytes from the buffer, advancing it by the amount written.
	fn write_buf<B: Buf + Send>(&mut self, buf: &mut B) -> impl Future<Output = Result<usize, Self::Error>> + Send;

	/// Abruptly terminate the stream with an error code. A clean finish is
	/// the stream simply being dropped.
	fn reset(&mut self, code: u32);
}

pub trait RecvStream: Send + 'static {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Read a chunk into the buffer, returning None at end of stream.
	fn read_buf(&mut self, buf: &mut BytesMut) -> impl Future<Output = Result<Option<usize>, Self::Error>> + Send;

	/// Read up to `max` bytes, returning None at end of stream.
	fn read(&mut self, max: usize) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send;

	/// Tell the peer to stop sending.
	fn stop(&mut self, code: u32);
}

#[cfg(test)]
pub(crate) mod mem {
	//! An in-memory transport session, used to exercise the client against a
	//! scripted peer without any sockets.

	use std::cmp;
	use std::sync::Arc;

	use bytes::{Buf, Bytes, BytesMut};
	use tokio::sync::{mpsc, Mutex};

	use super::{RecvStream, SendStream, Session};

	#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
	pub enum MemError {
		#[error("peer gone")]
		PeerGone,

		#[error("reset: code={0}")]
		Reset(u32),

		#[error("session closed: code={0}")]
		Closed(u32),
	}

	type StreamPair = (MemSendStream, MemRecvStream);

	struct Inner {
		// Streams we opened land in the peer's accept queues.
		peer_bi: mpsc::UnboundedSender<StreamPair>,
		peer_uni: mpsc::UnboundedSender<MemRecvStream>,
		accept_bi: Mutex<mpsc::UnboundedReceiver<StreamPair>>,
		accept_uni: Mutex<mpsc::UnboundedReceiver<MemRecvStream>>,
		closed: tokio::sync::watch::Sender<Option<u32>>,
	}

	#[derive(Clone)]
	pub struct MemSession {
		inner: Arc<Inner>,
	}

	/// Two connected sessions: what the client sends, the server accepts.
	pub fn pair() -> (MemSession, MemSession) {
		let (bi_a, bi_a_rx) = mpsc::unbounded_channel();
		let (bi_b, bi_b_rx) = mpsc::unbounded_channel();
		let (uni_a, uni_a_rx) = mpsc::unbounded_channel();
		let (uni_b, uni_b_rx) = mpsc::unbounded_channel();
		let closed = tokio::sync::watch::channel(None);

		let a = MemSession {
			inner: Arc::new(Inner {
				peer_bi: bi_b,
				peer_uni: uni_b,
				accept_bi: Mutex::new(bi_a_rx),
				accept_uni: Mutex::new(uni_a_rx),
				closed: closed.0.clone(),
			}),
		};

		let b = MemSession {
			inner: Arc::new(Inner {
				peer_bi: bi_a,
				peer_uni: uni_a,
				accept_bi: Mutex::new(bi_b_rx),
				accept_uni: Mutex::new(uni_b_rx),
				closed: closed.0,
			}),
		};

		(a, b)
	}

	fn byte_pipe() -> (MemSendStream, MemRecvStream) {
		let (tx, rx) = mpsc::unbounded_channel();
		(
			MemSendStream { tx },
			MemRecvStream {
				rx,
				pending: Bytes::new(),
				reset: None,
			},
		)
	}

	/// A connected pair of byte pipes: (local send, peer recv) x2.
	fn stream_pair() -> (StreamPair, StreamPair) {
		let (send_ab, recv_ab) = byte_pipe();
		let (send_ba, recv_ba) = byte_pipe();
		((send_ab, recv_ba), (send_ba, recv_ab))
	}

	impl Session for MemSession {
		type SendStream = MemSendStream;
		type RecvStream = MemRecvStream;
		type Error = MemError;

		async fn open_bi(&mut self) -> Result<StreamPair, MemError> {
			let (local, remote) = stream_pair();
			self.inner.peer_bi.send(remote).map_err(|_| MemError::PeerGone)?;
			Ok(local)
		}

		async fn accept_bi(&mut self) -> Result<StreamPair, MemError> {
			let mut rx = self.inner.accept_bi.lock().await;
			rx.recv().await.ok_or(MemError::PeerGone)
		}

		async fn open_uni(&mut self) -> Result<MemSendStream, MemError> {
			let (local, remote) = stream_pair();
			self.inner.peer_uni.send(remote.1).map_err(|_| MemError::PeerGone)?;
			Ok(local.0)
		}

		async fn accept_uni(&mut self) -> Result<MemRecvStream, MemError> {
			let mut rx = self.inner.accept_uni.lock().await;
			rx.recv().await.ok_or(MemError::PeerGone)
		}

		fn close(&mut self, code: u32, _reason: &str) {
			self.inner.closed.send_replace(Some(code));
		}

		async fn closed(&self) -> MemError {
			let mut rx = self.inner.closed.subscribe();
			loop {
				if let Some(code) = *rx.borrow() {
					return MemError::Closed(code);
				}
				if rx.changed().await.is_err() {
					return MemError::PeerGone;
				}
			}
		}
	}

	pub struct MemSendStream {
		tx: mpsc::UnboundedSender<Result<Bytes, u32>>,
	}

	impl SendStream for MemSendStream {
		type Error = MemError;

		async fn write_buf<B: Buf + Send>(&mut self, buf: &mut B) -> Result<usize, MemError> {
			let data = buf.copy_to_bytes(buf.remaining());
			let size = data.len();
			self.tx.send(Ok(data)).map_err(|_| MemError::PeerGone)?;
			Ok(size)
		}

		fn reset(&mut self, code: u32) {
			self.tx.send(Err(code)).ok();
		}
	}

	pub struct MemRecvStream {
		rx: mpsc::UnboundedReceiver<Result<Bytes, u32>>,
		pending: Bytes,
		reset: Option<u32>,
	}

	impl MemRecvStream {
		async fn fill(&mut self) -> Result<bool, MemError> {
			if let Some(code) = self.reset {
				return Err(MemError::Reset(code));
			}
			if !self.pending.is_empty() {
				return Ok(true);
			}
			match self.rx.recv().await {
				Some(Ok(data)) => {
					self.pending = data;
					Ok(true)
				}
				Some(Err(code)) => {
					self.reset = Some(code);
					Err(MemError::Reset(code))
				}
				None => Ok(false),
			}
		}
	}

	impl RecvStream for MemRecvStream {
		type Error = MemError;

		async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<Option<usize>, MemError> {
			if !self.fill().await? {
				return Ok(None);
			}
			let data = std::mem::take(&mut self.pending);
			buf.extend_from_slice(&data);
			Ok(Some(data.len()))
		}

		async fn read(&mut self, max: usize) -> Result<Option<Bytes>, MemError> {
			if !self.fill().await? {
				return Ok(None);
			}
			let size = cmp::min(max, self.pending.len());
			Ok(Some(self.pending.split_to(size)))
		}

		fn stop(&mut self, _code: u32) {
			self.rx.close();
		}
	}
}
