//! # warp-media: the playback side of a WARP broadcast
//!
//! Takes the opaque object payloads delivered by `warp-moqt` and turns them
//! into playable media:
//! - [catalog]: the JSON catalog describing the broadcast's tracks.
//! - [cmaf]: reassembles ISO-BMFF boxes into timed init/media segments.
//! - [SegmentBuffer]: an ordered per-track queue feeding the playout sink.
//! - [RateController]: nudges the playback rate to hold buffer and latency.

mod buffer;
mod controller;
mod error;
mod segment;
mod sink;

pub mod catalog;
pub mod cmaf;

pub use buffer::*;
pub use controller::*;
pub use error::*;
pub use segment::*;
pub use sink::*;

pub use catalog::Catalog;
