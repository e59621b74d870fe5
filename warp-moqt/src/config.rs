use std::time::Duration;

/// Protocol knobs for a client session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
	/// Advertised in CLIENT_SETUP; our own request ids must not exceed the
	/// peer's limit either.
	pub max_request_id: u64,

	/// How long to wait for SERVER_SETUP.
	pub setup_timeout: Duration,

	/// How long to wait for SUBSCRIBE_OK / SUBSCRIBE_ERROR.
	pub subscribe_ok_timeout: Duration,

	/// Objects buffered before SUBSCRIBE_OK are dropped once this old.
	pub pending_object_ttl: Duration,

	/// At most this many objects are buffered before SUBSCRIBE_OK.
	pub pending_object_cap: usize,

	/// How long a stream for an unregistered track alias is buffered before
	/// its objects are discarded. Independent of the pending-object TTL.
	pub unknown_alias_ttl: Duration,

	/// Cumulative time allowed for best-effort UNSUBSCRIBEs at shutdown.
	pub unsubscribe_budget: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			max_request_id: 100,
			setup_timeout: Duration::from_secs(5),
			subscribe_ok_timeout: Duration::from_secs(2),
			pending_object_ttl: Duration::from_millis(500),
			pending_object_cap: 50,
			unknown_alias_ttl: Duration::from_millis(500),
			unsubscribe_budget: Duration::from_millis(200),
		}
	}
}
