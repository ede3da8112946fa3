//! Top-level error taxonomy (spec §7). `ProtocolError` itself lives in
//! [`crate::protocol`] since it is part of the codec, not the transport glue.

use thiserror::Error;

/// Bad operator input: a malformed endpoint, a player name over 255 bytes, a
/// CLI flag that failed to parse. Fatal on startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("endpoint {0:?} is missing a port (expected host:port)")]
    MissingPort(String),

    #[error("player name is {len} bytes, exceeds the 255 byte limit")]
    NameTooLong { len: usize },

    #[error("could not resolve host {host:?}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("host {0:?} resolved to no addresses")]
    NoAddresses(String),
}

/// Failure to establish the server's TCP connection (client side) or to
/// bind/listen (server side). Fatal.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// An asynchronous write to a peer failed. Server: close and drop that
/// connection. Client: fatal.
#[derive(Debug, Error)]
#[error("failed to send to {to}: {source}")]
pub struct SendError {
    pub to: String,
    #[source]
    pub source: std::io::Error,
}
