use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use url::Url;

/// Play a WARP broadcast over MoQ Transport, writing CMAF to stdout.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
	#[command(flatten)]
	pub client: warp_native::ClientArgs,

	/// Server URL (https://...). Overrides the config file.
	#[arg(long)]
	pub url: Option<Url>,

	/// Namespace of the broadcast to play.
	#[arg(long)]
	pub namespace: String,

	/// Minimal buffer before playback slows down, in milliseconds.
	#[arg(long)]
	pub minimal_buffer_ms: Option<u64>,

	/// End-to-end latency to steer towards, in milliseconds.
	#[arg(long)]
	pub target_latency_ms: Option<u64>,

	/// The producer anchors timestamps to the UNIX epoch, enabling
	/// latency-based rate control.
	#[arg(long)]
	pub epoch_timestamps: bool,

	/// Path to the JSON config file.
	#[arg(long, default_value = "config.json")]
	pub config: PathBuf,
}

/// The `config.json` schema, everything optional.
#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
	default_server_url: Option<Url>,
	fingerprint_url: Option<Url>,
	minimal_buffer: Option<u64>,
	target_latency: Option<u64>,
}

/// The effective player configuration after merging flags over the config
/// file over built-in defaults.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
	pub bind: std::net::SocketAddr,
	pub url: Url,
	pub fingerprint_url: Option<Url>,
	pub namespace: String,
	pub minimal_buffer: Duration,
	pub target_latency: Duration,
	pub epoch_timestamps: bool,
}

impl Args {
	pub fn load(self) -> anyhow::Result<PlayerConfig> {
		let file = match std::fs::read(&self.config) {
			Ok(data) => serde_json::from_slice::<ConfigFile>(&data)
				.with_context(|| format!("invalid config file: {}", self.config.display()))?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
			Err(err) => {
				return Err(err).with_context(|| format!("failed to read {}", self.config.display()));
			}
		};

		let url = self
			.url
			.or(file.default_server_url)
			.context("no server url: pass --url or set defaultServerUrl in the config file")?;

		let minimal_buffer = Duration::from_millis(self.minimal_buffer_ms.or(file.minimal_buffer).unwrap_or(200));
		let target_latency = Duration::from_millis(self.target_latency_ms.or(file.target_latency).unwrap_or(300));

		if target_latency <= minimal_buffer {
			tracing::warn!(
				minimal = ?minimal_buffer,
				target = ?target_latency,
				"target latency should exceed the minimal buffer"
			);
		}

		Ok(PlayerConfig {
			bind: self.client.bind,
			url,
			fingerprint_url: self.client.fingerprint_url.or(file.fingerprint_url),
			namespace: self.namespace,
			minimal_buffer,
			target_latency,
			epoch_timestamps: self.epoch_timestamps,
		})
	}
}
