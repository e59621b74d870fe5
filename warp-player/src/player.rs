use std::time::Duration;

use anyhow::Context;
use warp_media::cmaf::Assembler;
use warp_media::{catalog, Catalog, ControllerConfig, RateController, SegmentBuffer};
use warp_moqt::coding::TrackNamespace;
use warp_moqt::{Session, SessionConfig};
use warp_native::{Client, ClientConfig};

use crate::config::PlayerConfig;
use crate::sink::PipeSink;

const SINK_RETRY: Duration = Duration::from_millis(50);

pub async fn run(config: PlayerConfig) -> anyhow::Result<()> {
	// Idle -> Connecting: resolve trust, dial QUIC, WebTransport handshake.
	let fingerprint = match &config.fingerprint_url {
		Some(url) => Some(warp_native::fetch_fingerprint(url).await?),
		None => None,
	};

	let client = Client::new(ClientConfig {
		bind: config.bind,
		fingerprint,
	})?;

	let transport = client.connect(&config.url).await?;
	tracing::info!(url = %config.url, "transport established");

	// SettingUp -> Ready.
	let session = Session::connect(transport, SessionConfig::default()).await?;

	let namespace: TrackNamespace = config.namespace.as_str().into();
	let catalog = fetch_catalog(&session, namespace.clone()).await?;
	tracing::info!(tracks = catalog.tracks.len(), "catalog received");

	let sink = PipeSink::new();
	let mut buffers = Vec::new();

	for track in catalog.media_tracks() {
		tracing::info!(
			track = %track.name,
			codec = track.codec.as_deref().unwrap_or("?"),
			"starting track"
		);

		let buffer = SegmentBuffer::new();
		buffers.push(buffer.clone());

		let track_namespace = track
			.namespace
			.as_deref()
			.map(TrackNamespace::from_utf8_path)
			.unwrap_or_else(|| namespace.clone());

		tokio::spawn(play_track(
			session.clone(),
			track_namespace,
			track.clone(),
			buffer.clone(),
			config.epoch_timestamps,
		));

		tokio::spawn(warp_media::run_drainer(buffer, sink.clone(), SINK_RETRY));
	}

	let controller = RateController::new(ControllerConfig {
		minimal_buffer: config.minimal_buffer,
		target_latency: config.target_latency,
		..Default::default()
	});
	tokio::spawn(warp_media::run_rate_control(controller, buffers.clone(), sink.clone()));

	let mut status = tokio::time::interval(Duration::from_secs(1));
	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("interrupted, closing");
				session.stop().await;
				return Ok(());
			}
			_ = session.closed() => {
				let metrics = session.metrics();
				match metrics.goaway_uri {
					Some(uri) => tracing::warn!(%uri, "server went away"),
					None => tracing::info!("session ended"),
				}
				return Ok(());
			}
			_ = status.tick() => {
				let metrics = session.metrics();
				let position = warp_media::PlayoutSink::current_time(&sink);
				let buffered = buffers
					.iter()
					.map(|buffer| buffer.buffered_ahead(position))
					.min()
					.unwrap_or_default();

				tracing::debug!(
					state = ?metrics.state,
					subscriptions = metrics.subscriptions,
					objects = metrics.objects_received,
					dropped = metrics.objects_dropped,
					buffered_ms = buffered.as_millis() as u64,
					rate = sink.playback_rate(),
					"status"
				);
			}
		}
	}
}

/// The catalog is the first object of the conventional catalog track.
async fn fetch_catalog(session: &Session, namespace: TrackNamespace) -> anyhow::Result<Catalog> {
	let mut track = session
		.subscribe(namespace, Catalog::DEFAULT_NAME)
		.await
		.context("failed to subscribe to the catalog")?;

	let object = track
		.next_object()
		.await?
		.context("catalog track ended without a catalog")?;

	let catalog = Catalog::from_slice(&object.payload).context("failed to parse catalog")?;

	// Live catalog updates are not consumed; drop the subscription.
	session.unsubscribe(&track);

	Ok(catalog)
}

/// Subscribe one media track (and its init track) and feed the assembler.
async fn play_track(
	session: Session,
	namespace: TrackNamespace,
	track: catalog::Track,
	buffer: SegmentBuffer,
	epoch_timestamps: bool,
) {
	if let Err(err) = run_track(session, namespace, &track, buffer, epoch_timestamps).await {
		tracing::warn!(track = %track.name, %err, "track playback ended");
	}
}

async fn run_track(
	session: Session,
	namespace: TrackNamespace,
	track: &catalog::Track,
	buffer: SegmentBuffer,
	epoch_timestamps: bool,
) -> anyhow::Result<()> {
	let mut assembler = Assembler::new(&track.name, epoch_timestamps);

	// WARP ships the init segment on its own track; fetch it first so the
	// media fragments have somewhere to hang.
	if let Some(init_name) = &track.init_track {
		let mut init = session
			.subscribe(namespace.clone(), init_name)
			.await
			.context("failed to subscribe to the init track")?;

		let object = init
			.next_object()
			.await?
			.context("init track ended without a segment")?;

		for segment in assembler.push(&object.payload)? {
			buffer.append(segment)?;
		}

		session.unsubscribe(&init);
	}

	let mut media = session.subscribe(namespace, &track.name).await?;

	while let Some(object) = media.next_object().await? {
		match assembler.push(&object.payload) {
			Ok(segments) => {
				for segment in segments {
					if let Err(err) = buffer.append(segment) {
						tracing::warn!(track = %track.name, %err, "segment dropped");
					}
				}
			}
			Err(err) => tracing::warn!(track = %track.name, %err, "failed to parse payload"),
		}
	}

	assembler.finish();
	tracing::info!(track = %track.name, reason = media.end_reason().unwrap_or("unknown"), "track ended");

	Ok(())
}
