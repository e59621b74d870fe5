use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::{Error, Result, Segment};

struct Inner {
	segments: VecDeque<Segment>,
	init_seen: bool,
	last_decode_time: Option<Duration>,
	/// Decode end of the newest appended segment.
	end_time: Option<Duration>,
	latest_presentation: Option<Duration>,
}

/// An ordered queue of segments for one track, shared between the
/// assembler task (append) and the sink drainer (pop).
///
/// Appends must advance `decode_time` strictly, except for the single init
/// segment which precedes everything else.
#[derive(Clone)]
pub struct SegmentBuffer {
	inner: Arc<Mutex<Inner>>,
	available: Arc<Notify>,
}

impl Default for SegmentBuffer {
	fn default() -> Self {
		Self::new()
	}
}

impl SegmentBuffer {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				segments: VecDeque::new(),
				init_seen: false,
				last_decode_time: None,
				end_time: None,
				latest_presentation: None,
			})),
			available: Arc::new(Notify::new()),
		}
	}

	pub fn append(&self, segment: Segment) -> Result<()> {
		let mut inner = self.inner.lock().unwrap();

		if segment.init {
			if inner.init_seen {
				return Err(Error::MultipleInit);
			}
			inner.init_seen = true;
		} else {
			if !inner.init_seen {
				return Err(Error::MissingInit);
			}
			if let Some(last) = inner.last_decode_time {
				if segment.decode_time <= last {
					return Err(Error::OutOfOrderAppend(segment.decode_time, last));
				}
			}

			inner.last_decode_time = Some(segment.decode_time);
			inner.end_time = Some(segment.decode_time + segment.duration);
			if let Some(presentation) = segment.presentation_time {
				inner.latest_presentation = Some(presentation);
			}
		}

		inner.segments.push_back(segment);
		drop(inner);

		self.available.notify_one();
		Ok(())
	}

	pub fn peek_decode_time(&self) -> Option<Duration> {
		self.inner.lock().unwrap().segments.front().map(|s| s.decode_time)
	}

	pub fn pop(&self) -> Option<Segment> {
		self.inner.lock().unwrap().segments.pop_front()
	}

	/// Wait for the next queued segment.
	pub async fn next(&self) -> Segment {
		loop {
			if let Some(segment) = self.pop() {
				return segment;
			}
			self.available.notified().await;
		}
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap().segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Media time buffered beyond the sink's playhead.
	pub fn buffered_ahead(&self, position: Duration) -> Duration {
		match self.inner.lock().unwrap().end_time {
			Some(end) => end.saturating_sub(position),
			None => Duration::ZERO,
		}
	}

	/// Wall-clock presentation time of the newest segment, if the producer
	/// anchors timestamps to the epoch.
	pub fn latest_presentation_time(&self) -> Option<Duration> {
		self.inner.lock().unwrap().latest_presentation
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;

	fn segment(init: bool, decode_ms: u64, duration_ms: u64) -> Segment {
		Segment {
			track: "video".to_string(),
			init,
			payload: Bytes::from_static(b"seg"),
			decode_time: Duration::from_millis(decode_ms),
			duration: Duration::from_millis(duration_ms),
			presentation_time: None,
		}
	}

	#[test]
	fn append_and_drain_in_order() {
		let buffer = SegmentBuffer::new();

		buffer.append(segment(true, 0, 0)).unwrap();
		buffer.append(segment(false, 0, 500)).unwrap();
		buffer.append(segment(false, 500, 500)).unwrap();

		assert_eq!(buffer.len(), 3);
		assert!(buffer.pop().unwrap().init);
		assert_eq!(buffer.pop().unwrap().decode_time, Duration::ZERO);
		assert_eq!(buffer.pop().unwrap().decode_time, Duration::from_millis(500));
		assert!(buffer.is_empty());
	}

	#[test]
	fn rejects_decode_time_rewind() {
		let buffer = SegmentBuffer::new();

		buffer.append(segment(true, 0, 0)).unwrap();
		buffer.append(segment(false, 1000, 500)).unwrap();

		let err = buffer.append(segment(false, 1000, 500)).unwrap_err();
		assert!(matches!(err, Error::OutOfOrderAppend(..)));

		let err = buffer.append(segment(false, 200, 500)).unwrap_err();
		assert!(matches!(err, Error::OutOfOrderAppend(..)));

		// The rejected segments were dropped, not queued.
		assert_eq!(buffer.len(), 2);
	}

	#[test]
	fn init_must_come_first_and_once() {
		let buffer = SegmentBuffer::new();

		let err = buffer.append(segment(false, 0, 500)).unwrap_err();
		assert!(matches!(err, Error::MissingInit));

		buffer.append(segment(true, 0, 0)).unwrap();
		let err = buffer.append(segment(true, 0, 0)).unwrap_err();
		assert!(matches!(err, Error::MultipleInit));
	}

	#[test]
	fn buffered_ahead_tracks_newest_segment() {
		let buffer = SegmentBuffer::new();

		buffer.append(segment(true, 0, 0)).unwrap();
		assert_eq!(buffer.buffered_ahead(Duration::ZERO), Duration::ZERO);

		buffer.append(segment(false, 0, 500)).unwrap();
		buffer.append(segment(false, 500, 500)).unwrap();

		// Buffered level is against the decode end, independent of pops.
		buffer.pop();
		assert_eq!(
			buffer.buffered_ahead(Duration::from_millis(300)),
			Duration::from_millis(700)
		);
		assert_eq!(
			buffer.buffered_ahead(Duration::from_millis(1500)),
			Duration::ZERO
		);
	}

	#[test]
	fn latest_presentation_time_follows_appends() {
		let buffer = SegmentBuffer::new();
		buffer.append(segment(true, 0, 0)).unwrap();

		let mut with_presentation = segment(false, 0, 500);
		with_presentation.presentation_time = Some(Duration::from_secs(1_700_000_000));
		buffer.append(with_presentation).unwrap();

		assert_eq!(
			buffer.latest_presentation_time(),
			Some(Duration::from_secs(1_700_000_000))
		);
	}

	#[tokio::test]
	async fn next_waits_for_append() {
		let buffer = SegmentBuffer::new();

		let waiter = {
			let buffer = buffer.clone();
			tokio::spawn(async move { buffer.next().await })
		};

		tokio::task::yield_now().await;
		buffer.append(segment(true, 0, 0)).unwrap();

		let segment = waiter.await.unwrap();
		assert!(segment.init);
	}
}
