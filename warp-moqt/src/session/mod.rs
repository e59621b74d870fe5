//! The MoQT client session: setup handshake, control stream loops,
//! subscription lifecycle and the object-stream router.

mod control;
mod router;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{oneshot, watch};

use crate::coding::{Reader, TrackNamespace, Writer};
use crate::message::{
	self, ClientSetup, ControlType, Filter, GoAway, GroupOrder, RequestsBlocked, ServerSetup, Subscribe, SubscribeDone,
	SubscribeError, SubscribeOk, Unsubscribe,
};
use crate::registry::{Counters, Registry};
use crate::transport;
use crate::{Error, SessionConfig, Track, TrackConsumer};

use control::{Command, Control};

/// Lifecycle of a session. `Idle` and `Connecting` belong to the caller
/// establishing the transport; the handshake starts at `SettingUp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	Connecting,
	SettingUp,
	Ready,
	Draining,
	Closed,
}

/// A point-in-time snapshot of session health.
#[derive(Clone, Debug)]
pub struct SessionMetrics {
	pub state: SessionState,
	pub subscriptions: usize,
	pub objects_received: u64,
	pub objects_dropped: u64,
	pub order_violations: u64,
	pub goaway_uri: Option<String>,
}

struct StateInner {
	state: SessionState,
	goaway_uri: Option<String>,
}

pub(crate) struct Shared {
	pub config: SessionConfig,
	pub registry: Mutex<Registry>,
	pub closing: watch::Sender<bool>,

	state: Mutex<StateInner>,
	control: Control,
	done: watch::Sender<bool>,
}

impl Shared {
	fn set_state(&self, state: SessionState) {
		self.state.lock().unwrap().state = state;
	}
}

/// A connected MoQT session, cheap to clone.
///
/// Dropping the handle does not close the session; call [`Session::stop`].
#[derive(Clone)]
pub struct Session {
	shared: Arc<Shared>,
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session").finish_non_exhaustive()
	}
}

impl Session {
	/// Perform the setup handshake over an established transport session
	/// and spawn the session loops.
	pub async fn connect<S: transport::Session>(mut transport: S, config: SessionConfig) -> Result<Self, Error> {
		let (send, recv) = transport.open_bi().await.map_err(Error::transport)?;
		let mut writer = Writer::new(send);
		let mut reader = Reader::new(recv);

		let setup = ClientSetup::new(config.max_request_id);
		let mut buf = Vec::new();
		message::encode_frame(&setup, &mut buf);
		writer.write_all(&mut Bytes::from(buf)).await?;

		let server = match tokio::time::timeout(config.setup_timeout, read_server_setup(&mut reader)).await {
			Ok(Ok(server)) => server,
			Ok(Err(err)) => {
				transport.close(err.to_code(), &err.to_string());
				return Err(err);
			}
			Err(_) => {
				let err = Error::Timeout("setup");
				transport.close(err.to_code(), &err.to_string());
				return Err(err);
			}
		};

		if !setup.versions.contains(&server.version) {
			let err = Error::UnsupportedVersion(server.version);
			transport.close(err.to_code(), &err.to_string());
			return Err(err);
		}

		tracing::debug!(version = format_args!("0x{:x}", server.version), "session ready");

		let (control, commands) = Control::new();

		let shared = Arc::new(Shared {
			config: config.clone(),
			registry: Mutex::new(Registry::new(config.max_request_id)),
			closing: watch::channel(false).0,
			state: Mutex::new(StateInner {
				state: SessionState::Ready,
				goaway_uri: None,
			}),
			control,
			done: watch::channel(false).0,
		});

		let write_task = tokio::spawn(run_control_write(writer, commands, transport.clone()));
		tokio::spawn(run(transport, reader, shared.clone(), write_task));

		Ok(Self { shared })
	}

	/// Subscribe to a track with default priority, order and filter.
	///
	/// Resolves once the publisher accepts; times out after
	/// [`SessionConfig::subscribe_ok_timeout`].
	pub async fn subscribe(&self, namespace: TrackNamespace, name: &str) -> Result<TrackConsumer, Error> {
		self.subscribe_track(Track::new(namespace, name)).await
	}

	pub async fn subscribe_track(&self, track: Track) -> Result<TrackConsumer, Error> {
		if *self.shared.closing.borrow() || self.shared.state.lock().unwrap().state != SessionState::Ready {
			return Err(Error::Closed);
		}

		let (reply, reply_rx) = oneshot::channel();
		let consumer = self
			.shared
			.registry
			.lock()
			.unwrap()
			.allocate(track.clone(), reply, &self.shared.config)?;

		let request_id = consumer.request_id;
		let msg = Subscribe {
			request_id,
			track_alias: consumer.track_alias,
			namespace: track.namespace,
			name: track.name,
			subscriber_priority: track.priority,
			group_order: GroupOrder::Ascending,
			filter: Filter::LatestObject,
			params: Default::default(),
		};

		if let Err(err) = self.shared.control.send(&msg) {
			self.shared.registry.lock().unwrap().abandon(request_id);
			return Err(err);
		}

		tracing::debug!(request_id, alias = consumer.track_alias, track = %consumer.info.name, "subscribe sent");

		match tokio::time::timeout(self.shared.config.subscribe_ok_timeout, reply_rx).await {
			Ok(Ok(Ok(()))) => Ok(consumer),
			Ok(Ok(Err(err))) => Err(err),
			// The session tore down and dropped the reply.
			Ok(Err(_)) => Err(Error::Closed),
			Err(_) => {
				self.shared.registry.lock().unwrap().abandon(request_id);
				tracing::warn!(request_id, "no subscribe response in time");
				Err(Error::Timeout("subscribe_ok"))
			}
		}
	}

	/// Best-effort UNSUBSCRIBE; does not wait for the publisher.
	pub fn unsubscribe(&self, sub: &TrackConsumer) {
		if self.shared.registry.lock().unwrap().unsubscribe(sub.request_id) {
			self.shared
				.control
				.send(&Unsubscribe {
					request_id: sub.request_id,
				})
				.ok();
		}
	}

	/// Drain and close the session. Idempotent; by the time it returns
	/// every subscription has observed its terminal.
	pub async fn stop(&self) {
		self.shared.closing.send_replace(true);
		self.closed().await;
	}

	/// Wait until the session is fully torn down.
	pub async fn closed(&self) {
		let mut done = self.shared.done.subscribe();
		while !*done.borrow_and_update() {
			if done.changed().await.is_err() {
				return;
			}
		}
	}

	pub fn metrics(&self) -> SessionMetrics {
		let (state, goaway_uri) = {
			let state = self.shared.state.lock().unwrap();
			(state.state, state.goaway_uri.clone())
		};

		let registry = self.shared.registry.lock().unwrap();
		let Counters {
			objects_received,
			objects_dropped,
			order_violations,
		} = registry.counters;

		SessionMetrics {
			state,
			subscriptions: registry.len(),
			objects_received,
			objects_dropped,
			order_violations,
			goaway_uri,
		}
	}
}

async fn read_server_setup<R: transport::RecvStream>(reader: &mut Reader<R>) -> Result<ServerSetup, Error> {
	let typ = reader.decode::<u64>().await?;
	let size = reader.decode::<u16>().await? as usize;
	let payload = reader.read_exact(size).await?;

	match ControlType::try_from(typ) {
		Ok(ControlType::ServerSetup) => Ok(message::decode_payload(payload)?),
		_ => Err(Error::UnexpectedMessage),
	}
}

/// Supervise the session: run the loops, then tear everything down once.
async fn run<S: transport::Session>(
	mut transport: S,
	reader: Reader<S::RecvStream>,
	shared: Arc<Shared>,
	write_task: tokio::task::JoinHandle<()>,
) {
	let mut closing = shared.closing.subscribe();

	let result = tokio::select! {
		// Checked first so a stop() racing a stream error is reported as
		// a clean shutdown.
		biased;
		_ = closing.wait_for(|closing| *closing) => Ok(()),
		res = run_control_read(reader, shared.clone()) => res,
		res = router::run_accept(transport.clone(), shared.clone()) => res,
		err = transport.closed() => Err(Error::transport(err)),
	};

	let error = match result {
		Ok(()) => None,
		Err(err) if *shared.closing.borrow() => {
			tracing::info!(%err, "error during shutdown, ignored");
			None
		}
		Err(err) => {
			tracing::warn!(%err, "session failed");
			Some(err)
		}
	};

	shared.set_state(SessionState::Draining);
	// Cancels every stream-reading task before the unsubscribes go out.
	shared.closing.send_replace(true);

	let active = shared.registry.lock().unwrap().drain("closing");
	for request_id in active {
		shared.control.send(&Unsubscribe { request_id }).ok();
	}
	shared.control.flush(shared.config.unsubscribe_budget).await;
	write_task.abort();

	match &error {
		Some(err) => transport.close(err.to_code(), &err.to_string()),
		None => transport.close(0, "closing"),
	}

	shared.set_state(SessionState::Closed);
	shared.done.send_replace(true);
	tracing::info!("session closed");
}

async fn run_control_read<R: transport::RecvStream>(mut reader: Reader<R>, shared: Arc<Shared>) -> Result<(), Error> {
	loop {
		let typ = reader.decode::<u64>().await?;
		let size = reader.decode::<u16>().await? as usize;
		let payload = reader.read_exact(size).await?;

		let Ok(typ) = ControlType::try_from(typ) else {
			tracing::info!(r#type = format_args!("0x{typ:x}"), size, "skipping unknown control message");
			continue;
		};

		match typ {
			ControlType::SubscribeOk => {
				let msg: SubscribeOk = message::decode_payload(payload)?;
				recv_subscribe_ok(&shared, msg);
			}
			ControlType::SubscribeError => {
				let msg: SubscribeError = message::decode_payload(payload)?;
				recv_subscribe_error(&shared, msg);
			}
			ControlType::SubscribeDone => {
				let msg: SubscribeDone = message::decode_payload(payload)?;
				recv_subscribe_done(&shared, msg);
			}
			ControlType::RequestsBlocked => {
				let msg: RequestsBlocked = message::decode_payload(payload)?;
				tracing::info!(maximum = msg.maximum_request_id, "peer reports requests blocked");
				shared.registry.lock().unwrap().limit_requests(msg.maximum_request_id);
			}
			ControlType::GoAway => {
				let msg: GoAway = message::decode_payload(payload)?;
				tracing::info!(uri = %msg.new_session_uri, "goaway received, draining");
				shared.state.lock().unwrap().goaway_uri = Some(msg.new_session_uri);
				shared.closing.send_replace(true);
			}
			// We never publish, and setup is long since over.
			ControlType::Subscribe
			| ControlType::Unsubscribe
			| ControlType::ClientSetup
			| ControlType::ServerSetup => return Err(Error::UnexpectedMessage),
		}
	}
}

fn recv_subscribe_ok(shared: &Shared, msg: SubscribeOk) {
	let now = Instant::now();
	if shared
		.registry
		.lock()
		.unwrap()
		.activate(msg.request_id, now, &shared.config)
	{
		tracing::debug!(request_id = msg.request_id, "subscription active");
	} else {
		tracing::debug!(request_id = msg.request_id, "subscribe ok for unknown request");
	}
}

fn recv_subscribe_error(shared: &Shared, msg: SubscribeError) {
	tracing::warn!(
		request_id = msg.request_id,
		code = msg.code,
		reason = %msg.reason,
		"subscribe rejected"
	);

	shared
		.registry
		.lock()
		.unwrap()
		.fail(msg.request_id, msg.code, &msg.reason, msg.track_alias);
}

fn recv_subscribe_done(shared: &Shared, msg: SubscribeDone) {
	tracing::debug!(
		request_id = msg.request_id,
		status = msg.status_code,
		streams = msg.stream_count,
		reason = %msg.reason,
		"subscription done"
	);

	shared.registry.lock().unwrap().finish(msg.request_id, &msg.reason);
}

/// Drain queued control frames onto the stream. On a write failure the
/// transport is closed, which the supervisor observes.
async fn run_control_write<S: transport::Session>(
	mut writer: Writer<S::SendStream>,
	mut commands: tokio::sync::mpsc::UnboundedReceiver<Command>,
	mut transport: S,
) {
	while let Some(command) = commands.recv().await {
		match command {
			Command::Frame(frame) => {
				if let Err(err) = writer.write_all(&mut Bytes::from(frame)).await {
					tracing::debug!(%err, "control write failed");
					transport.close(err.to_code(), &err.to_string());
					return;
				}
			}
			Command::Flush(reply) => {
				reply.send(()).ok();
			}
		}
	}
}
