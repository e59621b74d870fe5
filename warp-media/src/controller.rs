use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{PlayoutSink, SegmentBuffer};

/// Proportional gain applied to the relative latency error.
const GAIN: f64 = 0.2;

/// Rate changes smaller than this are not worth disturbing the sink for.
const RATE_DEADBAND: f64 = 0.005;

/// Margin above the minimal buffer that still counts as worrying.
const WARN_MARGIN: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferLevel {
	/// Below the minimal buffer; underrun imminent.
	Critical,
	/// Within the warning margin of the minimal buffer.
	Warn,
	Ok,
}

#[derive(Clone, Debug)]
pub struct ControllerConfig {
	/// Buffer level below which playback slows to refill.
	pub minimal_buffer: Duration,

	/// End-to-end latency the controller steers towards.
	pub target_latency: Duration,

	/// How often the control law runs.
	pub tick: Duration,
}

impl Default for ControllerConfig {
	fn default() -> Self {
		Self {
			minimal_buffer: Duration::from_millis(200),
			target_latency: Duration::from_millis(300),
			tick: Duration::from_millis(100),
		}
	}
}

impl ControllerConfig {
	/// The target latency must exceed the minimal buffer, otherwise the
	/// slow-down and catch-up rules fight each other.
	fn validated(mut self) -> Self {
		if self.target_latency <= self.minimal_buffer {
			let target = self.minimal_buffer + WARN_MARGIN;
			tracing::warn!(
				target = ?self.target_latency,
				minimal = ?self.minimal_buffer,
				adjusted = ?target,
				"target latency must exceed minimal buffer"
			);
			self.target_latency = target;
		}
		self
	}
}

/// Maps (buffer level, end-to-end latency) to a playback-rate command.
///
/// Keeping the buffer alive takes priority over chasing the latency
/// target; rate nudges are clamped to +/-2% so audio stays inconspicuous.
pub struct RateController {
	config: ControllerConfig,
	rate: f64,
}

impl RateController {
	pub fn new(config: ControllerConfig) -> Self {
		Self {
			config: config.validated(),
			rate: 1.0,
		}
	}

	/// The currently commanded rate.
	pub fn rate(&self) -> f64 {
		self.rate
	}

	pub fn config(&self) -> &ControllerConfig {
		&self.config
	}

	pub fn level(&self, buffered: Duration) -> BufferLevel {
		if buffered < self.config.minimal_buffer {
			BufferLevel::Critical
		} else if buffered < self.config.minimal_buffer + WARN_MARGIN {
			BufferLevel::Warn
		} else {
			BufferLevel::Ok
		}
	}

	/// Run the control law once; returns the new rate when the command
	/// changed by more than the deadband.
	pub fn tick(&mut self, buffered: Duration, latency: Option<Duration>) -> Option<f64> {
		let target = self.config.target_latency.as_secs_f64();

		let mut rate = 1.0;
		if buffered < self.config.minimal_buffer {
			// Refilling the buffer beats every latency concern.
			rate = 0.97;
		} else if let Some(latency) = latency {
			let latency = latency.as_secs_f64();
			if latency > target {
				rate = (1.0 + GAIN * (latency - target) / target).clamp(1.0, 1.02);
			} else if latency < target {
				rate = (1.0 - GAIN * (target - latency) / target).clamp(0.98, 1.0);
			}
		}

		if (rate - self.rate).abs() < RATE_DEADBAND {
			return None;
		}

		self.rate = rate;
		Some(rate)
	}
}

/// Periodically observe the buffers and the wall clock, pushing rate
/// commands into the sink. Runs forever; select against shutdown.
pub async fn run_rate_control<S: PlayoutSink>(mut controller: RateController, buffers: Vec<SegmentBuffer>, mut sink: S) {
	let mut ticker = tokio::time::interval(controller.config.tick);
	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

	loop {
		ticker.tick().await;

		let position = sink.current_time();
		let buffered = buffers
			.iter()
			.map(|buffer| buffer.buffered_ahead(position))
			.min()
			.unwrap_or_default();

		// Latency against the newest wall-clock-anchored segment.
		let latency = buffers
			.iter()
			.filter_map(|buffer| buffer.latest_presentation_time())
			.max()
			.and_then(|presentation| {
				let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
				Some(now.saturating_sub(presentation))
			});

		if let Some(rate) = controller.tick(buffered, latency) {
			tracing::debug!(rate, buffered = ?buffered, latency = ?latency, "playback rate updated");
			sink.set_playback_rate(rate);
		}

		if controller.level(buffered) == BufferLevel::Critical {
			tracing::trace!(buffered = ?buffered, "buffer critical");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn controller() -> RateController {
		RateController::new(ControllerConfig::default())
	}

	fn ms(v: u64) -> Duration {
		Duration::from_millis(v)
	}

	#[test]
	fn starving_buffer_slows_playback() {
		let mut c = controller();
		assert_eq!(c.tick(ms(150), Some(ms(250))), Some(0.97));
	}

	#[test]
	fn high_latency_speeds_up_clamped() {
		let mut c = controller();
		assert_eq!(c.tick(ms(250), Some(ms(500))), Some(1.02));
	}

	#[test]
	fn low_latency_slows_down_clamped() {
		let mut c = controller();
		assert_eq!(c.tick(ms(250), Some(ms(200))), Some(0.98));
	}

	#[test]
	fn on_target_is_unity() {
		let mut c = controller();
		c.tick(ms(150), Some(ms(300))); // move off 1.0 first
		assert_eq!(c.tick(ms(250), Some(ms(300))), Some(1.0));
	}

	#[test]
	fn tiny_perturbations_are_suppressed() {
		let mut c = controller();
		assert_eq!(c.tick(ms(250), Some(ms(301))), None);
		assert_eq!(c.rate(), 1.0);
	}

	#[test]
	fn buffer_takes_priority_over_latency() {
		let mut c = controller();
		// Latency says speed up, the starving buffer wins.
		assert_eq!(c.tick(ms(100), Some(ms(900))), Some(0.97));
	}

	#[test]
	fn unknown_latency_leaves_rate_alone() {
		let mut c = controller();
		assert_eq!(c.tick(ms(250), None), None);
		assert_eq!(c.rate(), 1.0);
	}

	#[test]
	fn rate_non_increasing_as_buffer_drains() {
		let mut c = controller();
		let mut last = f64::MAX;
		for buffered in (0..200).rev().step_by(10) {
			c.rate = 1.0; // reset the deadband between probes
			let rate = c.tick(ms(buffered), Some(ms(300))).unwrap_or(c.rate());
			assert!(rate <= last);
			last = rate;
		}
	}

	#[test]
	fn buffer_levels() {
		let c = controller();
		assert_eq!(c.level(ms(100)), BufferLevel::Critical);
		assert_eq!(c.level(ms(199)), BufferLevel::Critical);
		assert_eq!(c.level(ms(220)), BufferLevel::Warn);
		assert_eq!(c.level(ms(260)), BufferLevel::Ok);
	}

	#[test]
	fn degenerate_config_is_repaired() {
		let c = RateController::new(ControllerConfig {
			minimal_buffer: ms(400),
			target_latency: ms(300),
			tick: ms(100),
		});
		assert!(c.config().target_latency > c.config().minimal_buffer);
	}
}
