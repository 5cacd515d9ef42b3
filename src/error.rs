use std::io;
use thiserror::Error;

use crate::command::ProtocolError;

/// type alias for all operations on the catalog that could fail with a [`CatalogError`]
pub type Result<T> = std::result::Result<T, CatalogError>;

/// The Error variants used throughout the catalog server, engines and client.
/// Lower level errors from third party crates are wrapped with `#[from]` so they can be
/// propagated with `?`
#[derive(Error, Debug)]
pub enum CatalogError {
    /// variant for errors caused by file or socket IO
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// a catalog entry could not be (de)serialized
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// errors raised by the sled engine
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// a command line option or on-disk marker could not be parsed
    #[error("{0}")]
    Parsing(String),

    /// a generic error carrying only a description
    #[error("{0}")]
    StringErr(String),

    /// another thread panicked while holding the engine lock
    #[error("the engine lock was poisoned by a panicked thread")]
    LockPoisoned,

    /// a log entry did not hold the record its index position claimed
    #[error("corrupt log entry for key {key} in generation {gen}")]
    CorruptLog {
        /// the key being read
        key: i64,
        /// the generation of the log that was read
        gen: u64,
    },

    /// the listener kept failing to accept connections
    #[error("accept failed {attempts} times in a row: {source}")]
    Accept {
        /// number of consecutive failures
        attempts: u32,
        /// the last accept error
        source: io::Error,
    },

    /// a request or reply violated the line protocol
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
