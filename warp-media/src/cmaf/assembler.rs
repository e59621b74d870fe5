use std::collections::HashMap;
use std::io;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use mp4_atom::{Any, Atom, DecodeMaybe, Encode, Ftyp, Mdat, Moof, Moov, Tfdt};

use crate::{Error, Result, Segment};

/// Rebuilds timed segments for one track from its object payloads.
///
/// Payloads are concatenated and scanned for ISO-BMFF boxes:
/// - `ftyp` + `moov` become the single initialization segment,
/// - each `moof` + `mdat` pair becomes one media segment.
///
/// Boxes split across objects are buffered until complete. A parse failure
/// poisons only the bytes accumulated so far; the caller keeps feeding.
pub struct Assembler {
	track: String,

	/// Whether the producer anchors `tfdt` times to the UNIX epoch, which
	/// makes presentation times comparable to the wall clock.
	epoch_timestamps: bool,

	buffer: BytesMut,
	timescales: HashMap<u32, u64>,
	movie_timescale: u64,
	ftyp: Option<Ftyp>,
	init_done: bool,
	pending_moof: Option<Moof>,
}

impl Assembler {
	pub fn new(track: &str, epoch_timestamps: bool) -> Self {
		Self {
			track: track.to_string(),
			epoch_timestamps,
			buffer: Default::default(),
			timescales: Default::default(),
			movie_timescale: 0,
			ftyp: None,
			init_done: false,
			pending_moof: None,
		}
	}

	/// Feed more payload bytes, returning any segments they completed.
	///
	/// On a parse error the accumulated bytes and any half-built segment are
	/// discarded; the assembler stays usable for the next payload.
	pub fn push(&mut self, payload: &[u8]) -> Result<Vec<Segment>> {
		self.buffer.extend_from_slice(payload);

		let mut segments = Vec::new();

		loop {
			let mut cursor = io::Cursor::new(&self.buffer);
			let atom = match Any::decode_maybe(&mut cursor) {
				Ok(Some(atom)) => {
					let size = cursor.position() as usize;
					self.buffer.advance(size);
					atom
				}
				// The next box is not complete yet.
				Ok(None) => return Ok(segments),
				Err(err) => {
					self.reset();
					return Err(err.into());
				}
			};

			match self.accept(atom) {
				Ok(Some(segment)) => segments.push(segment),
				Ok(None) => {}
				Err(err) => {
					self.reset();
					return Err(err);
				}
			}
		}
	}

	/// The subscription ended; anything half-assembled is dropped.
	pub fn finish(&mut self) {
		if self.pending_moof.is_some() || !self.buffer.is_empty() {
			tracing::debug!(
				track = %self.track,
				buffered = self.buffer.len(),
				"discarding partial segment at end of track"
			);
		}
		self.reset();
	}

	fn reset(&mut self) {
		self.buffer.clear();
		self.pending_moof = None;
		self.ftyp = None;
	}

	fn accept(&mut self, atom: Any) -> Result<Option<Segment>> {
		match atom {
			Any::Ftyp(ftyp) => {
				if self.init_done {
					return Err(Error::MultipleInit);
				}
				self.ftyp = Some(ftyp);
				Ok(None)
			}
			Any::Moov(moov) => {
				if self.init_done {
					return Err(Error::MultipleInit);
				}
				let ftyp = self.ftyp.take().ok_or(Error::MissingBox(Ftyp::KIND))?;
				Ok(Some(self.init_segment(ftyp, moov)?))
			}
			Any::Moof(moof) => {
				if !self.init_done {
					return Err(Error::MissingInit);
				}
				if self.pending_moof.is_some() {
					return Err(Error::UnexpectedBox(Moof::KIND));
				}
				self.pending_moof = Some(moof);
				Ok(None)
			}
			Any::Mdat(mdat) => {
				let moof = self.pending_moof.take().ok_or(Error::UnexpectedBox(Mdat::KIND))?;
				Ok(Some(self.media_segment(moof, mdat)?))
			}
			other => {
				// styp, sidx, prft and friends carry nothing we need.
				tracing::trace!(track = %self.track, atom = ?other, "ignoring box");
				Ok(None)
			}
		}
	}

	fn init_segment(&mut self, ftyp: Ftyp, moov: Moov) -> Result<Segment> {
		self.movie_timescale = moov.mvhd.timescale as u64;
		for trak in &moov.trak {
			self.timescales
				.insert(trak.tkhd.track_id, trak.mdia.mdhd.timescale as u64);
		}

		let mut payload = BytesMut::new();
		ftyp.encode(&mut payload)?;
		moov.encode(&mut payload)?;

		self.init_done = true;
		tracing::debug!(track = %self.track, size = payload.len(), "initialization segment ready");

		Ok(Segment {
			track: self.track.clone(),
			init: true,
			payload: payload.freeze(),
			decode_time: Duration::ZERO,
			duration: Duration::ZERO,
			presentation_time: None,
		})
	}

	fn media_segment(&mut self, moof: Moof, mdat: Mdat) -> Result<Segment> {
		let traf = moof.traf.first().ok_or(Error::MissingBox(Tfdt::KIND))?;
		let tfdt = traf.tfdt.as_ref().ok_or(Error::MissingBox(Tfdt::KIND))?;

		// Tracks carry their own timescale; fall back to the movie's.
		let timescale = self
			.timescales
			.get(&traf.tfhd.track_id)
			.copied()
			.unwrap_or(self.movie_timescale)
			.max(1);

		let decode_time = Duration::from_secs_f64(tfdt.base_media_decode_time as f64 / timescale as f64);

		let mut ticks: u64 = 0;
		for traf in &moof.traf {
			let default = traf.tfhd.default_sample_duration;
			for trun in &traf.trun {
				for entry in &trun.entries {
					ticks += entry.duration.or(default).unwrap_or(0) as u64;
				}
			}
		}
		let duration = Duration::from_secs_f64(ticks as f64 / timescale as f64);

		let mut payload = BytesMut::new();
		moof.encode(&mut payload)?;
		mdat.encode(&mut payload)?;

		Ok(Segment {
			track: self.track.clone(),
			init: false,
			payload: payload.freeze(),
			decode_time,
			duration,
			presentation_time: self.epoch_timestamps.then_some(decode_time),
		})
	}
}
