use std::net;
use std::sync::Arc;
use std::time;

use anyhow::Context;
use clap::Parser;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::hash::HashAlgorithm;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use url::Url;

use crate::WebSession;

/// Transport flags shared by binaries that dial a MoQT server.
#[derive(Parser, Clone, Debug)]
pub struct ClientArgs {
	/// Listen for UDP packets on the given address.
	#[arg(long, default_value = "[::]:0")]
	pub bind: net::SocketAddr,

	/// Fetch the server certificate fingerprint from this URL and pin it
	/// instead of using the system trust store.
	#[arg(long)]
	pub fingerprint_url: Option<Url>,
}

impl Default for ClientArgs {
	fn default() -> Self {
		Self {
			bind: "[::]:0".parse().unwrap(),
			fingerprint_url: None,
		}
	}
}

pub struct ClientConfig {
	pub bind: net::SocketAddr,

	/// Pinned SHA-256 of the server certificate. System roots otherwise.
	pub fingerprint: Option<[u8; 32]>,
}

/// A QUIC endpoint ready to dial WebTransport sessions.
#[derive(Clone)]
pub struct Client {
	endpoint: quinn::Endpoint,
	tls: rustls::ClientConfig,
	transport: Arc<quinn::TransportConfig>,
}

impl Client {
	pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
		let provider = Arc::new(rustls::crypto::ring::default_provider());

		let endpoint = quinn::Endpoint::client(config.bind).context("failed to bind UDP socket")?;

		let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
			.with_protocol_versions(&[&rustls::version::TLS13])
			.context("failed to configure TLS 1.3")?;

		let mut tls = match config.fingerprint {
			Some(fingerprint) => builder
				.dangerous()
				.with_custom_certificate_verifier(Arc::new(FingerprintVerifier { provider, fingerprint }))
				.with_no_client_auth(),
			None => {
				let mut roots = rustls::RootCertStore::empty();
				for cert in rustls_native_certs::load_native_certs().certs {
					roots.add(cert).ok();
				}
				builder.with_root_certificates(roots).with_no_client_auth()
			}
		};

		tls.alpn_protocols = vec![web_transport_quinn::ALPN.as_bytes().to_vec()];

		let mut transport = quinn::TransportConfig::default();
		transport.max_idle_timeout(Some(time::Duration::from_secs(10).try_into().unwrap()));
		transport.keep_alive_interval(Some(time::Duration::from_secs(4)));

		Ok(Self {
			endpoint,
			tls,
			transport: Arc::new(transport),
		})
	}

	/// Dial the URL and complete the WebTransport handshake.
	pub async fn connect(&self, url: &Url) -> anyhow::Result<WebSession> {
		anyhow::ensure!(url.scheme() == "https", "url scheme must be 'https'");

		let host = url.host().context("missing host")?.to_string();
		let port = url.port().unwrap_or(443);

		// Lookup the DNS entry.
		let addr = tokio::net::lookup_host((host.clone(), port))
			.await
			.context("failed DNS lookup")?
			.next()
			.context("no DNS results")?;

		let config: quinn::crypto::rustls::QuicClientConfig =
			self.tls.clone().try_into().context("failed to build QUIC TLS config")?;
		let mut config = quinn::ClientConfig::new(Arc::new(config));
		config.transport_config(self.transport.clone());

		tracing::debug!(%url, %addr, "dialing");

		let connection = self
			.endpoint
			.connect_with(config, addr, &host)
			.context("failed to start QUIC connection")?
			.await
			.context("failed to establish QUIC connection")?;

		let session = web_transport_quinn::Session::connect(connection, url.clone())
			.await
			.context("failed to establish WebTransport session")?;

		Ok(WebSession::new(session))
	}
}

/// Accepts exactly the certificate whose SHA-256 was pinned.
///
/// Used against self-signed, short-lived certificates where a CA chain
/// does not exist; the fingerprint comes out of band over HTTPS.
#[derive(Debug)]
struct FingerprintVerifier {
	provider: Arc<rustls::crypto::CryptoProvider>,
	fingerprint: [u8; 32],
}

impl ServerCertVerifier for FingerprintVerifier {
	fn verify_server_cert(
		&self,
		end_entity: &CertificateDer<'_>,
		_intermediates: &[CertificateDer<'_>],
		_server_name: &ServerName<'_>,
		_ocsp_response: &[u8],
		_now: UnixTime,
	) -> Result<ServerCertVerified, rustls::Error> {
		let digest = sha256(&self.provider, end_entity.as_ref());

		if digest.as_ref() == self.fingerprint {
			Ok(ServerCertVerified::assertion())
		} else {
			tracing::warn!("server certificate does not match the pinned fingerprint");
			Err(rustls::Error::InvalidCertificate(
				rustls::CertificateError::ApplicationVerificationFailure,
			))
		}
	}

	fn verify_tls12_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		rustls::crypto::verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
	}

	fn verify_tls13_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		rustls::crypto::verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
	}

	fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
		self.provider.signature_verification_algorithms.supported_schemes()
	}
}

/// Compute SHA-256 using whatever hash provider the crypto provider has.
fn sha256(provider: &rustls::crypto::CryptoProvider, data: &[u8]) -> rustls::crypto::hash::Output {
	let hash_provider = provider
		.cipher_suites
		.iter()
		.find_map(|suite| {
			let hash_provider = suite.tls13()?.common.hash_provider;
			(hash_provider.algorithm() == HashAlgorithm::SHA256).then_some(hash_provider)
		})
		.expect("no SHA-256 hash provider");

	hash_provider.hash(data)
}
