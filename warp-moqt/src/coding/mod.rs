//! Encoding and decoding of wire types: QUIC-style varints, length-prefixed
//! strings, namespace tuples, and buffered stream readers/writers.

mod decode;
mod encode;
mod reader;
mod tuple;
mod varint;
mod writer;

pub use decode::*;
pub use encode::*;
pub use reader::*;
pub use tuple::*;
pub use varint::*;
pub use writer::*;

// Re-export the bytes crate
pub use bytes::*;
