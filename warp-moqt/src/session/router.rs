use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::coding::{DecodeError, Reader};
use crate::message::SubgroupHeader;
use crate::registry::Routed;
use crate::transport;
use crate::{Error, Object, ObjectStatus};

use super::Shared;

/// Accept inbound unidirectional streams and fan each out to its own task.
pub(crate) async fn run_accept<S: transport::Session>(mut transport: S, shared: Arc<Shared>) -> Result<(), Error> {
	loop {
		let stream = transport.accept_uni().await.map_err(Error::transport)?;
		let reader = Reader::new(stream);
		let shared = shared.clone();

		tokio::spawn(async move {
			let mut closing = shared.closing.subscribe();

			tokio::select! {
				// Shutdown cancels the stream without surfacing an error.
				_ = closing.wait_for(|closing| *closing) => {}
				res = run_stream(reader, &shared) => {
					if let Err(err) = res {
						if *shared.closing.borrow() {
							tracing::trace!(%err, "object stream error during shutdown");
						} else {
							tracing::debug!(%err, "object stream failed");
						}
					}
				}
			}
		});
	}
}

/// Parse one subgroup stream: header, then objects until EOF.
///
/// Errors here drop only this stream, never the session.
async fn run_stream<R: transport::RecvStream>(mut reader: Reader<R>, shared: &Arc<Shared>) -> Result<(), Error> {
	let stream_type = reader.decode::<u64>().await?;
	if stream_type != SubgroupHeader::STREAM_TYPE {
		let err = Error::UnexpectedStream(stream_type);
		reader.abort(&err);
		return Err(err);
	}

	let header: SubgroupHeader = reader.decode().await?;
	tracing::trace!(
		alias = header.track_alias,
		group = header.group_id,
		subgroup = header.subgroup_id,
		"subgroup stream started"
	);

	let mut last_object_id = None;

	loop {
		// A clean EOF between objects ends the subgroup.
		let Some(object_id) = reader.decode_maybe::<u64>().await? else {
			tracing::trace!(
				alias = header.track_alias,
				group = header.group_id,
				"subgroup stream complete"
			);
			return Ok(());
		};

		let extensions = match reader.decode::<usize>().await? {
			0 => None,
			size => Some(reader.read_exact(size).await?),
		};

		let (status, payload) = match reader.decode::<usize>().await? {
			// An empty payload carries an explicit status instead.
			0 => {
				let status = reader.decode::<u64>().await?;
				let status = ObjectStatus::try_from(status).map_err(|_| DecodeError::InvalidValue)?;
				(status, Bytes::new())
			}
			size => (ObjectStatus::Normal, reader.read_exact(size).await?),
		};

		// Object ids never go backwards within a subgroup.
		if last_object_id.is_some_and(|last| object_id < last) {
			shared.registry.lock().unwrap().note_order_violation();
			tracing::warn!(
				alias = header.track_alias,
				group = header.group_id,
				object = object_id,
				"out of order object dropped"
			);
			continue;
		}
		last_object_id = Some(object_id);

		let object = Object {
			track_alias: header.track_alias,
			group_id: header.group_id,
			subgroup_id: header.subgroup_id,
			object_id,
			publisher_priority: header.publisher_priority,
			extensions,
			status,
			payload,
		};

		route(object, shared);
	}
}


fn route(object: Object, shared: &Arc<Shared>) {
	let alias = object.track_alias;
	let now = Instant::now();

	let routed = shared.registry.lock().unwrap().route(object, now, &shared.config);

	match routed {
		Routed::Delivered => {}
		Routed::Pending { dropped_oldest } => {
			if dropped_oldest {
				tracing::warn!(alias, "pending queue full, dropping oldest object");
			}
		}
		Routed::Speculative { new_slot, dropped_oldest } => {
			if dropped_oldest {
				tracing::warn!(alias, "speculative queue full, dropping oldest object");
			}

			if new_slot {
				// Nothing is subscribed under this alias yet; give a
				// subscription a moment to appear, then discard.
				let shared = shared.clone();
				tokio::spawn(async move {
					tokio::time::sleep(shared.config.unknown_alias_ttl).await;
					let dropped = shared.registry.lock().unwrap().expire_slot(alias, now);
					if dropped > 0 {
						tracing::debug!(alias, dropped, "discarding objects for unknown alias");
					}
				});
			}
		}
	}
}

