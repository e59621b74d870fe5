use std::time::Duration;

use bytes::Bytes;

use crate::SegmentBuffer;

/// Why the sink refused an append.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
	/// Backpressure; retry the same segment after a short delay.
	#[error("sink is saturated")]
	Busy,

	/// The sink is gone for good.
	#[error("sink failed: {0}")]
	Failed(String),
}

/// The playout end of the pipeline: a media source fed one init blob and a
/// sequence of timed segments per track.
///
/// Implementations signal backpressure by returning [`SinkError::Busy`];
/// the drainer retries the same segment until accepted.
pub trait PlayoutSink: Send + 'static {
	fn append_init(&mut self, track: &str, payload: &Bytes) -> Result<(), SinkError>;
	fn append_segment(&mut self, track: &str, payload: &Bytes, decode_time: Duration) -> Result<(), SinkError>;

	fn set_playback_rate(&mut self, rate: f64);

	/// Current playhead position in media time.
	fn current_time(&self) -> Duration;
}

/// Move segments from a buffer into the sink as fast as it accepts them.
///
/// Runs until the sink fails for good; select against shutdown.
pub async fn run_drainer<S: PlayoutSink>(buffer: SegmentBuffer, mut sink: S, retry: Duration) {
	loop {
		let segment = buffer.next().await;

		loop {
			let result = if segment.init {
				sink.append_init(&segment.track, &segment.payload)
			} else {
				sink.append_segment(&segment.track, &segment.payload, segment.decode_time)
			};

			match result {
				Ok(()) => break,
				Err(SinkError::Busy) => tokio::time::sleep(retry).await,
				Err(SinkError::Failed(reason)) => {
					tracing::warn!(track = %segment.track, %reason, "playout sink failed");
					return;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	use crate::Segment;

	#[derive(Clone, Default)]
	struct RecordingSink {
		appended: Arc<Mutex<Vec<(String, bool)>>>,
		busy_budget: Arc<Mutex<u32>>,
	}

	impl PlayoutSink for RecordingSink {
		fn append_init(&mut self, track: &str, _payload: &Bytes) -> Result<(), SinkError> {
			self.appended.lock().unwrap().push((track.to_string(), true));
			Ok(())
		}

		fn append_segment(&mut self, track: &str, _payload: &Bytes, _decode_time: Duration) -> Result<(), SinkError> {
			let mut busy = self.busy_budget.lock().unwrap();
			if *busy > 0 {
				*busy -= 1;
				return Err(SinkError::Busy);
			}
			self.appended.lock().unwrap().push((track.to_string(), false));
			Ok(())
		}

		fn set_playback_rate(&mut self, _rate: f64) {}

		fn current_time(&self) -> Duration {
			Duration::ZERO
		}
	}

	fn segment(init: bool, decode_ms: u64) -> Segment {
		Segment {
			track: "audio".to_string(),
			init,
			payload: Bytes::from_static(b"seg"),
			decode_time: Duration::from_millis(decode_ms),
			duration: Duration::from_millis(500),
			presentation_time: None,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn drains_and_retries_on_backpressure() {
		let buffer = SegmentBuffer::new();
		let sink = RecordingSink::default();
		*sink.busy_budget.lock().unwrap() = 2;

		tokio::spawn(run_drainer(
			buffer.clone(),
			sink.clone(),
			Duration::from_millis(10),
		));

		buffer.append(segment(true, 0)).unwrap();
		buffer.append(segment(false, 0)).unwrap();
		buffer.append(segment(false, 500)).unwrap();

		// Two Busy rejections cost two retry delays.
		tokio::time::sleep(Duration::from_millis(100)).await;

		let appended = sink.appended.lock().unwrap().clone();
		assert_eq!(
			appended,
			vec![
				("audio".to_string(), true),
				("audio".to_string(), false),
				("audio".to_string(), false),
			]
		);
	}
}
