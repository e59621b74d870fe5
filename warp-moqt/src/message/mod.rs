//! Control messages (draft-14) and the data-stream subgroup header.
//!
//! Every control message is framed as `type (varint)`, `length (u16 BE)`,
//! `payload`. The payload codecs live in the per-message files; the framing
//! helpers live in `frame.rs`.

mod blocked;
mod frame;
mod goaway;
mod parameters;
mod setup;
mod subgroup;
mod subscribe;

pub use blocked::*;
pub use frame::*;
pub use goaway::*;
pub use parameters::*;
pub use setup::*;
pub use subgroup::*;
pub use subscribe::*;
