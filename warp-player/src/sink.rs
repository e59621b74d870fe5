use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use warp_media::{PlayoutSink, SinkError};

struct Inner {
	out: std::io::Stdout,
	started: Option<Instant>,
	/// Media time consumed so far, advanced at the commanded rate.
	position: Duration,
	position_at: Option<Instant>,
	rate: f64,
}

impl Inner {
	/// Fold wall-clock progress since the last observation into the
	/// playhead position at the current rate.
	fn advance(&mut self) {
		let now = Instant::now();
		if let Some(at) = self.position_at {
			let elapsed = now.duration_since(at).as_secs_f64() * self.rate;
			self.position += Duration::from_secs_f64(elapsed);
		}
		self.position_at = Some(now);
	}
}

/// A playout sink that concatenates CMAF onto stdout, for piping into
/// ffplay or a file.
///
/// A pipe cannot actually play faster or slower; the commanded rate still
/// drives the synthetic playhead so the control loop behaves as it would
/// against a real media element.
#[derive(Clone)]
pub struct PipeSink {
	inner: Arc<Mutex<Inner>>,
}

impl PipeSink {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				out: std::io::stdout(),
				started: None,
				position: Duration::ZERO,
				position_at: None,
				rate: 1.0,
			})),
		}
	}

	pub fn playback_rate(&self) -> f64 {
		self.inner.lock().unwrap().rate
	}
}

impl PlayoutSink for PipeSink {
	fn append_init(&mut self, track: &str, payload: &Bytes) -> Result<(), SinkError> {
		tracing::info!(track, size = payload.len(), "writing init segment");
		let mut inner = self.inner.lock().unwrap();
		inner
			.out
			.write_all(payload)
			.and_then(|_| inner.out.flush())
			.map_err(|err| SinkError::Failed(err.to_string()))
	}

	fn append_segment(&mut self, track: &str, payload: &Bytes, decode_time: Duration) -> Result<(), SinkError> {
		tracing::trace!(track, size = payload.len(), decode = ?decode_time, "writing segment");
		let mut inner = self.inner.lock().unwrap();

		if inner.started.is_none() {
			inner.started = Some(Instant::now());
			inner.position = decode_time;
			inner.position_at = Some(Instant::now());
		}

		inner
			.out
			.write_all(payload)
			.and_then(|_| inner.out.flush())
			.map_err(|err| SinkError::Failed(err.to_string()))
	}

	fn set_playback_rate(&mut self, rate: f64) {
		let mut inner = self.inner.lock().unwrap();
		inner.advance();
		inner.rate = rate;
		tracing::info!(rate, "playback rate");
	}

	fn current_time(&self) -> Duration {
		let mut inner = self.inner.lock().unwrap();
		inner.advance();
		inner.position
	}
}

impl Default for PipeSink {
	fn default() -> Self {
		Self::new()
	}
}
