use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use tokio::sync::oneshot;

use crate::coding::TrackNamespace;
use crate::track::{TrackConsumer, TrackProducer};
use crate::{Error, Object, SessionConfig, Track};

type TrackKey = (TrackNamespace, String);

/// State of one subscription while it lives in the registry.
///
/// The full lifecycle is Requested -> Active -> Closed/Failed; terminal
/// subscriptions leave the registry, with the terminal delivered through
/// the track producer.
pub(crate) enum SubscribeState {
	/// SUBSCRIBE sent, no reply yet. Early objects queue here.
	Requested {
		reply: oneshot::Sender<Result<(), Error>>,
		pending: VecDeque<(Instant, Object)>,
	},
	Active,
}

pub(crate) struct Entry {
	pub track: Track,
	pub alias: u64,
	pub state: SubscribeState,
	pub producer: TrackProducer,
}

/// An unknown-alias slot: objects held briefly in case a subscription for
/// this alias is registered right after its data started arriving.
struct Slot {
	created: Instant,
	objects: VecDeque<(Instant, Object)>,
}

/// Where the registry routed an incoming object.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Routed {
	Delivered,
	/// Buffered on a Requested subscription. `dropped_oldest` is set when
	/// the queue was full and the oldest entry was evicted.
	Pending { dropped_oldest: bool },
	/// Buffered on a speculative slot for an unknown alias. `new_slot` is
	/// set when this object created the slot, so the caller can arm its
	/// expiry timer.
	Speculative { new_slot: bool, dropped_oldest: bool },
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
	pub objects_received: u64,
	pub objects_dropped: u64,
	pub order_violations: u64,
}

/// Maps request id, track alias and track name to subscription state.
///
/// All mutation happens under the session's mutex; lookups also come from
/// the per-stream reader tasks.
pub(crate) struct Registry {
	next_request_id: u64,
	max_request_id: u64,
	next_alias: u64,

	by_request: HashMap<u64, Entry>,
	by_alias: HashMap<u64, u64>,
	by_track: HashMap<TrackKey, u64>,
	reserved_alias: HashMap<TrackKey, u64>,
	speculative: HashMap<u64, Slot>,

	pub counters: Counters,
}

impl Registry {
	pub fn new(max_request_id: u64) -> Self {
		Self {
			next_request_id: 0,
			max_request_id,
			next_alias: 1,
			by_request: Default::default(),
			by_alias: Default::default(),
			by_track: Default::default(),
			reserved_alias: Default::default(),
			speculative: Default::default(),
			counters: Default::default(),
		}
	}

	pub fn len(&self) -> usize {
		self.by_request.len()
	}

	/// Lower the request id limit, e.g. after REQUESTS_BLOCKED.
	pub fn limit_requests(&mut self, maximum: u64) {
		self.max_request_id = self.max_request_id.min(maximum);
	}

	/// Reserve the next even request id and a track alias, and register the
	/// subscription as Requested.
	pub fn allocate(
		&mut self,
		track: Track,
		reply: oneshot::Sender<Result<(), Error>>,
		config: &SessionConfig,
	) -> Result<TrackConsumer, Error> {
		let key = (track.namespace.clone(), track.name.clone());
		if self.by_track.contains_key(&key) {
			return Err(Error::DuplicateTrack);
		}

		if self.next_request_id > self.max_request_id {
			return Err(Error::RequestIdsExhausted);
		}
		let request_id = self.next_request_id;
		self.next_request_id += 2;

		// A previous SUBSCRIBE_ERROR may have suggested the alias to use.
		let alias = match self.reserved_alias.remove(&key) {
			Some(alias) => alias,
			None => loop {
				let alias = self.next_alias;
				self.next_alias += 1;
				if !self.by_alias.contains_key(&alias) {
					break alias;
				}
			},
		};

		let (producer, consumer) = TrackConsumer::pair(track.clone(), request_id, alias);

		// Objects may already be waiting on a speculative slot for this alias.
		let mut pending = VecDeque::new();
		if let Some(slot) = self.speculative.remove(&alias) {
			pending = slot.objects;
			pending.truncate(config.pending_object_cap);
		}

		self.by_alias.insert(alias, request_id);
		self.by_track.insert(key, request_id);
		self.by_request.insert(
			request_id,
			Entry {
				track,
				alias,
				state: SubscribeState::Requested {
					reply,
					pending,
				},
				producer,
			},
		);

		Ok(consumer)
	}

	/// SUBSCRIBE_OK: activate and flush the pending queue in arrival order,
	/// dropping entries older than the TTL.
	pub fn activate(&mut self, request_id: u64, now: Instant, config: &SessionConfig) -> bool {
		let Some(entry) = self.by_request.get_mut(&request_id) else {
			return false;
		};

		let state = std::mem::replace(&mut entry.state, SubscribeState::Active);
		match state {
			SubscribeState::Requested { reply, pending } => {
				for (at, object) in pending {
					if now.duration_since(at) <= config.pending_object_ttl {
						self.counters.objects_received += 1;
						entry.producer.object(object);
					} else {
						self.counters.objects_dropped += 1;
					}
				}
				reply.send(Ok(())).ok();
				true
			}
			SubscribeState::Active => true,
		}
	}

	/// SUBSCRIBE_ERROR: fail and remove the subscription. A non-zero
	/// suggested alias is kept for the next attempt on the same track.
	pub fn fail(&mut self, request_id: u64, code: u64, reason: &str, new_alias: u64) -> bool {
		let Some(mut entry) = self.remove_maps(request_id) else {
			return false;
		};

		if new_alias != 0 {
			let key = (entry.track.namespace.clone(), entry.track.name.clone());
			self.reserved_alias.insert(key, new_alias);
		}

		let err = Error::Subscribe {
			code,
			reason: reason.to_string(),
		};

		match entry.state {
			SubscribeState::Requested { reply, .. } => {
				reply.send(Err(err)).ok();
			}
			SubscribeState::Active => entry.producer.fail(err),
		}
		true
	}

	/// SUBSCRIBE_DONE: the publisher finished this subscription.
	pub fn finish(&mut self, request_id: u64, reason: &str) -> bool {
		let Some(mut entry) = self.remove_maps(request_id) else {
			return false;
		};

		match entry.state {
			SubscribeState::Requested { reply, .. } => {
				reply.send(Err(Error::Closed)).ok();
			}
			SubscribeState::Active => {}
		}
		entry.producer.end(reason);
		true
	}

	/// Drop a subscription that never got a reply in time.
	pub fn abandon(&mut self, request_id: u64) {
		self.remove_maps(request_id);
	}

	/// Local unsubscribe; the track ends cleanly.
	pub fn unsubscribe(&mut self, request_id: u64) -> bool {
		match self.remove_maps(request_id) {
			Some(mut entry) => {
				entry.producer.end("unsubscribed");
				true
			}
			None => false,
		}
	}

	/// Route one received object by track alias.
	pub fn route(&mut self, object: Object, now: Instant, config: &SessionConfig) -> Routed {
		let alias = object.track_alias;

		if let Some(request_id) = self.by_alias.get(&alias) {
			let entry = self.by_request.get_mut(request_id).expect("alias map out of sync");
			match &mut entry.state {
				SubscribeState::Active => {
					self.counters.objects_received += 1;
					entry.producer.object(object);
					Routed::Delivered
				}
				SubscribeState::Requested { pending, .. } => {
					let dropped_oldest = pending.len() >= config.pending_object_cap;
					if dropped_oldest {
						pending.pop_front();
						self.counters.objects_dropped += 1;
					}
					pending.push_back((now, object));
					Routed::Pending { dropped_oldest }
				}
			}
		} else {
			let new_slot = !self.speculative.contains_key(&alias);
			let slot = self.speculative.entry(alias).or_insert_with(|| Slot {
				created: now,
				objects: Default::default(),
			});

			let dropped_oldest = slot.objects.len() >= config.pending_object_cap;
			if dropped_oldest {
				slot.objects.pop_front();
				self.counters.objects_dropped += 1;
			}
			slot.objects.push_back((now, object));

			Routed::Speculative {
				new_slot,
				dropped_oldest,
			}
		}
	}

	/// Discard a speculative slot if it is still the one created at `epoch`.
	pub fn expire_slot(&mut self, alias: u64, epoch: Instant) -> usize {
		match self.speculative.get(&alias) {
			Some(slot) if slot.created == epoch => {
				let slot = self.speculative.remove(&alias).unwrap();
				self.counters.objects_dropped += slot.objects.len() as u64;
				slot.objects.len()
			}
			_ => 0,
		}
	}

	pub fn note_order_violation(&mut self) {
		self.counters.order_violations += 1;
		self.counters.objects_dropped += 1;
	}

	/// Tear down every subscription, returning the request ids that were
	/// Active (for best-effort UNSUBSCRIBEs).
	pub fn drain(&mut self, reason: &str) -> Vec<u64> {
		let mut active = Vec::new();

		for (request_id, mut entry) in self.by_request.drain() {
			match entry.state {
				SubscribeState::Requested { reply, .. } => {
					reply.send(Err(Error::Closed)).ok();
				}
				SubscribeState::Active => active.push(request_id),
			}
			entry.producer.end(reason);
		}

		self.by_alias.clear();
		self.by_track.clear();
		self.speculative.clear();

		active.sort_unstable();
		active
	}

	fn remove_maps(&mut self, request_id: u64) -> Option<Entry> {
		let entry = self.by_request.remove(&request_id)?;
		self.by_alias.remove(&entry.alias);
		self.by_track
			.remove(&(entry.track.namespace.clone(), entry.track.name.clone()));
		Some(entry)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	use bytes::Bytes;

	use crate::ObjectStatus;

	fn config() -> SessionConfig {
		SessionConfig::default()
	}

	fn subscribe(registry: &mut Registry, name: &str) -> Result<TrackConsumer, Error> {
		let (reply, _rx) = oneshot::channel();
		registry.allocate(Track::new("live".into(), name), reply, &config())
	}

	fn object(alias: u64, id: u64) -> Object {
		Object {
			track_alias: alias,
			group_id: 0,
			subgroup_id: 0,
			object_id: id,
			publisher_priority: 128,
			extensions: None,
			status: ObjectStatus::Normal,
			payload: Bytes::from_static(b"x"),
		}
	}

	#[test]
	fn request_ids_are_even_and_monotonic() {
		let mut registry = Registry::new(100);

		for i in 0..51 {
			let sub = subscribe(&mut registry, &format!("track{i}")).unwrap();
			assert_eq!(sub.request_id, i * 2);
		}

		// 51 subscriptions spent ids 0..=100; the next would be 102.
		assert!(matches!(
			subscribe(&mut registry, "one-too-many"),
			Err(Error::RequestIdsExhausted)
		));
	}

	#[test]
	fn requests_blocked_lowers_the_cap() {
		let mut registry = Registry::new(100);

		subscribe(&mut registry, "first").unwrap();
		registry.limit_requests(0);

		assert!(matches!(
			subscribe(&mut registry, "second"),
			Err(Error::RequestIdsExhausted)
		));
	}

	#[test]
	fn duplicate_track_rejected() {
		let mut registry = Registry::new(100);

		subscribe(&mut registry, "video").unwrap();
		assert!(matches!(
			subscribe(&mut registry, "video"),
			Err(Error::DuplicateTrack)
		));
	}

	#[test]
	fn aliases_unique_and_reserved_after_error() {
		let mut registry = Registry::new(100);

		let sub = subscribe(&mut registry, "video").unwrap();
		let alias = sub.track_alias;

		// The publisher rejects and suggests another alias.
		assert!(registry.fail(sub.request_id, 0x4, "retry", 77));

		let retry = subscribe(&mut registry, "video").unwrap();
		assert_ne!(retry.track_alias, alias);
		assert_eq!(retry.track_alias, 77);
	}

	#[tokio::test]
	async fn pending_objects_flush_in_arrival_order() {
		let mut registry = Registry::new(100);
		let mut sub = subscribe(&mut registry, "video").unwrap();
		let alias = sub.track_alias;

		let now = Instant::now();
		for id in 0..5 {
			let routed = registry.route(object(alias, id), now, &config());
			assert_eq!(routed, Routed::Pending { dropped_oldest: false });
		}

		assert!(registry.activate(sub.request_id, now, &config()));

		for id in 0..5 {
			let obj = sub.next_object().await.unwrap().unwrap();
			assert_eq!(obj.object_id, id);
		}
	}

	#[tokio::test]
	async fn pending_ttl_drops_stale_objects() {
		let mut registry = Registry::new(100);
		let mut sub = subscribe(&mut registry, "video").unwrap();
		let alias = sub.track_alias;

		let config = config();
		let now = Instant::now();
		let stale = now - config.pending_object_ttl - Duration::from_millis(1);

		registry.route(object(alias, 0), stale, &config);
		registry.route(object(alias, 1), now, &config);

		registry.activate(sub.request_id, now, &config);

		let obj = sub.next_object().await.unwrap().unwrap();
		assert_eq!(obj.object_id, 1);
		assert_eq!(registry.counters.objects_dropped, 1);
	}

	#[test]
	fn pending_cap_evicts_oldest() {
		let mut registry = Registry::new(100);
		let sub = subscribe(&mut registry, "video").unwrap();
		let alias = sub.track_alias;

		let config = config();
		let now = Instant::now();

		for id in 0..config.pending_object_cap as u64 {
			assert_eq!(
				registry.route(object(alias, id), now, &config),
				Routed::Pending { dropped_oldest: false }
			);
		}

		assert_eq!(
			registry.route(object(alias, 999), now, &config),
			Routed::Pending { dropped_oldest: true }
		);
	}

	#[test]
	fn unknown_alias_buffers_speculatively() {
		let mut registry = Registry::new(100);
		let config = config();
		let now = Instant::now();

		assert_eq!(
			registry.route(object(42, 0), now, &config),
			Routed::Speculative {
				new_slot: true,
				dropped_oldest: false
			}
		);
		assert_eq!(
			registry.route(object(42, 1), now, &config),
			Routed::Speculative {
				new_slot: false,
				dropped_oldest: false
			}
		);

		assert_eq!(registry.expire_slot(42, now), 2);
		assert_eq!(registry.counters.objects_dropped, 2);
	}

	#[tokio::test]
	async fn drain_resolves_every_subscription_once() {
		let mut registry = Registry::new(100);

		let (reply, pending_rx) = oneshot::channel();
		registry
			.allocate(Track::new("live".into(), "requested"), reply, &config())
			.unwrap();

		let (reply, _rx) = oneshot::channel();
		let mut active = registry
			.allocate(Track::new("live".into(), "active"), reply, &config())
			.unwrap();
		registry.activate(active.request_id, Instant::now(), &config());

		let unsubscribes = registry.drain("closing");
		assert_eq!(unsubscribes, vec![active.request_id]);

		assert!(matches!(pending_rx.await, Ok(Err(Error::Closed))));
		assert!(active.next_object().await.unwrap().is_none());
		assert_eq!(active.end_reason(), Some("closing"));
		assert_eq!(registry.len(), 0);
	}
}
