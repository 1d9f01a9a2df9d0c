//! Error types for the loader.
//!
//! Every error in this enum is recoverable. Per-record failures are turned
//! into a `false` outcome by the worker that hit them and only ever logged;
//! per-file failures degrade the file to "zero processed, zero errors".
//!
//! ## Error Cases
//! - `Encode` / `Decode`: the `UserApps` message could not be (de)serialized.
//! - `MalformedKey`: the key is not a legal memcached key.
//! - `Store`: the server answered a write with something other than `STORED`.
//! - `Timeout`: a store operation exceeded the client timeout.
//! - `Io`: a socket or file operation failed.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the loader.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Serializing a `UserApps` message failed.
    #[error("Encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Deserializing a `UserApps` message failed.
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The key contains whitespace or control bytes, or is too long.
    #[error("Malformed key: {key:?}")]
    MalformedKey { key: String },

    /// The store rejected the write.
    #[error("Store error for {key}: {reason}")]
    Store { key: String, reason: String },

    /// A store operation did not complete within the client timeout.
    #[error("Timed out during {op} on {addr}")]
    Timeout { op: &'static str, addr: String },

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
