use std::{cmp, io};

use bytes::{Buf, Bytes, BytesMut};

use crate::coding::{Decode, DecodeError};
use crate::transport;
use crate::Error;

/// A buffered reader over a receive stream.
///
/// Decoding retries on `Short` until the stream yields enough bytes, so a
/// field split across QUIC packets is reassembled transparently.
pub struct Reader<S: transport::RecvStream> {
	stream: S,
	buffer: BytesMut,
}

impl<S: transport::RecvStream> Reader<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	pub async fn decode<T: Decode>(&mut self) -> Result<T, Error> {
		loop {
			let mut cursor = io::Cursor::new(&self.buffer);
			match T::decode(&mut cursor) {
				Ok(msg) => {
					let size = cursor.position() as usize;
					self.buffer.advance(size);
					return Ok(msg);
				}
				Err(DecodeError::Short) => {
					if self
						.stream
						.read_buf(&mut self.buffer)
						.await
						.map_err(Error::transport)?
						.is_none()
					{
						// Stream ended in the middle of a field.
						return Err(Error::Decode(DecodeError::Short));
					}
				}
				Err(e) => return Err(Error::Decode(e)),
			}
		}
	}

	/// Decode a value, or return None if the stream ends cleanly first.
	pub async fn decode_maybe<T: Decode>(&mut self) -> Result<Option<T>, Error> {
		if self.buffer.is_empty()
			&& self
				.stream
				.read_buf(&mut self.buffer)
				.await
				.map_err(Error::transport)?
				.is_none()
		{
			return Ok(None);
		}

		Ok(Some(self.decode().await?))
	}

	/// Read exactly `size` bytes.
	pub async fn read_exact(&mut self, size: usize) -> Result<Bytes, Error> {
		while self.buffer.len() < size {
			if self
				.stream
				.read_buf(&mut self.buffer)
				.await
				.map_err(Error::transport)?
				.is_none()
			{
				return Err(Error::Decode(DecodeError::Short));
			}
		}

		Ok(self.buffer.split_to(size).freeze())
	}

	/// Returns a non-empty chunk of data, or None if the stream is done.
	pub async fn read(&mut self, max: usize) -> Result<Option<Bytes>, Error> {
		if !self.buffer.is_empty() {
			let size = cmp::min(max, self.buffer.len());
			return Ok(Some(self.buffer.split_to(size).freeze()));
		}

		self.stream.read(max).await.map_err(Error::transport)
	}

	pub fn abort(&mut self, err: &Error) {
		self.stream.stop(err.to_code());
	}
}
