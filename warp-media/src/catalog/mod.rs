//! The WARP catalog: a JSON description of the broadcast's tracks.
//!
//! The catalog arrives as the payload of the first subscribed track; this
//! module only models and parses it. Choosing which tracks to play is up
//! to the application.

mod root;
mod track;

pub use root::*;
pub use track::*;
