use bytes::{Buf, Bytes, BytesMut};

use warp_moqt::transport;

/// Adapters from `web-transport-quinn` to the `warp-moqt` transport traits.
///
/// Newtypes rather than blanket impls: both the traits and the concrete
/// types are foreign here.
#[derive(Clone)]
pub struct WebSession(web_transport_quinn::Session);

impl WebSession {
	pub fn new(session: web_transport_quinn::Session) -> Self {
		Self(session)
	}

	pub fn url(&self) -> &url::Url {
		self.0.url()
	}
}

impl transport::Session for WebSession {
	type SendStream = WebSendStream;
	type RecvStream = WebRecvStream;
	type Error = web_transport_quinn::SessionError;

	async fn open_bi(&mut self) -> Result<(WebSendStream, WebRecvStream), Self::Error> {
		let (send, recv) = self.0.open_bi().await?;
		Ok((WebSendStream(send), WebRecvStream(recv)))
	}

	async fn accept_bi(&mut self) -> Result<(WebSendStream, WebRecvStream), Self::Error> {
		let (send, recv) = self.0.accept_bi().await?;
		Ok((WebSendStream(send), WebRecvStream(recv)))
	}

	async fn open_uni(&mut self) -> Result<WebSendStream, Self::Error> {
		Ok(WebSendStream(self.0.open_uni().await?))
	}

	async fn accept_uni(&mut self) -> Result<WebRecvStream, Self::Error> {
		Ok(WebRecvStream(self.0.accept_uni().await?))
	}

	fn close(&mut self, code: u32, reason: &str) {
		self.0.close(code, reason.as_bytes());
	}

	async fn closed(&self) -> Self::Error {
		self.0.closed().await
	}
}

pub struct WebSendStream(web_transport_quinn::SendStream);

impl transport::SendStream for WebSendStream {
	type Error = web_transport_quinn::WriteError;

	async fn write_buf<B: Buf + Send>(&mut self, buf: &mut B) -> Result<usize, Self::Error> {
		let n = self.0.write(buf.chunk()).await?;
		buf.advance(n);
		Ok(n)
	}

	fn reset(&mut self, code: u32) {
		self.0.reset(code);
	}
}

pub struct WebRecvStream(web_transport_quinn::RecvStream);

impl transport::RecvStream for WebRecvStream {
	type Error = web_transport_quinn::ReadError;

	async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<Option<usize>, Self::Error> {
		let mut tmp = [0u8; 4096];
		match self.0.read(&mut tmp).await? {
			Some(n) => {
				buf.extend_from_slice(&tmp[..n]);
				Ok(Some(n))
			}
			None => Ok(None),
		}
	}

	async fn read(&mut self, max: usize) -> Result<Option<Bytes>, Self::Error> {
		let mut tmp = vec![0u8; max];
		match self.0.read(&mut tmp).await? {
			Some(n) => {
				tmp.truncate(n);
				Ok(Some(Bytes::from(tmp)))
			}
			None => Ok(None),
		}
	}

	fn stop(&mut self, code: u32) {
		self.0.stop(code);
	}
}
