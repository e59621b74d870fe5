//! Native glue for the WARP player: a QUIC endpoint, TLS configuration
//! with optional certificate-fingerprint pinning, the one-shot fingerprint
//! fetch, and the adapter from `web-transport-quinn` to the `warp-moqt`
//! transport traits.

mod client;
mod fingerprint;
mod web;

pub use client::*;
pub use fingerprint::*;
pub use web::*;
