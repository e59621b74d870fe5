//! Reassembles CMAF (fragmented MP4) segments from object payloads.

mod assembler;

pub use assembler::*;
