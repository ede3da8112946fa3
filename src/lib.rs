//! `robots`: the shared library behind the `robots-server` and
//! `robots-client` binaries (spec §1/§2) — the wire codec, the server's
//! authoritative turn engine, and the client's dual-connection
//! multiplexer.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod game;
pub mod logger;
pub mod protocol;
pub mod rng;
pub mod server;
