use bytes::BytesMut;

use crate::coding::Encode;
use crate::transport;
use crate::Error;

// A wrapper around a send stream that encodes into an internal buffer.
pub struct Writer<S: transport::SendStream> {
	stream: S,
	buffer: BytesMut,
}

impl<S: transport::SendStream> Writer<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	pub async fn encode<T: Encode>(&mut self, msg: &T) -> Result<(), Error> {
		self.buffer.clear();
		msg.encode(&mut self.buffer);

		while !self.buffer.is_empty() {
			self.stream
				.write_buf(&mut self.buffer)
				.await
				.map_err(Error::transport)?;
		}

		Ok(())
	}

	pub async fn write_all<B: bytes::Buf + Send>(&mut self, buf: &mut B) -> Result<(), Error> {
		while buf.has_remaining() {
			self.stream.write_buf(buf).await.map_err(Error::transport)?;
		}
		Ok(())
	}

	pub fn abort(&mut self, err: &Error) {
		self.stream.reset(err.to_code());
	}
}
