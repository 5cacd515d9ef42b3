//! This module provides the storage engines a catalog can be kept in.
//! The three engines are [`LogCatalog`], a log-structured engine that persists catalog
//! entries into "command log" files, [`SledCatalog`], a wrapper around the [`sled`] database
//! engine, and [`MemoryCatalog`], a volatile catalog kept in a concurrent map.
//!
//! Every engine is cheap to clone; clones share the same underlying catalog, so one engine
//! can be handed to every connection.
//!
//! [`sled`]: https://docs.rs/sled/latest/sled/
use std::fmt;
use std::str::FromStr;

use crate::movie::{Key, Movie, Summary};
use crate::{CatalogError, Result};

/// The outcome of [`CatalogEngine::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// the movie was stored
    Inserted,
    /// a movie with the same key was already stored, nothing was written
    Duplicate,
}

/// A trait for the operations the catalog server needs from a storage engine.
///
/// Each method is a single atomic operation of the engine. In particular `insert` checks for
/// an existing key and stores the movie in one step, so two connections racing to create the
/// same movie can never both succeed.
pub trait CatalogEngine: Clone + Send + 'static {
    /// stores `movie` under `movie.key` unless that key is already present
    fn insert(&self, movie: Movie) -> Result<Insert>;

    /// Replaces the genre of the movie stored under `key`.
    ///
    /// Returns `false` if the key does not exist.
    fn update_genre(&self, key: Key, genre: &str) -> Result<bool>;

    /// Removes the movie stored under `key`.
    ///
    /// Returns `false` if the key does not exist.
    fn delete(&self, key: Key) -> Result<bool>;

    /// Gets the movie stored under `key`.
    ///
    /// Returns `None` if the key does not exist.
    fn get(&self, key: Key) -> Result<Option<Movie>>;

    /// every movie in the catalog, ordered by key
    fn list_all(&self) -> Result<Vec<Movie>>;

    /// the key and title of every movie, ordered by key
    fn list_summaries(&self) -> Result<Vec<Summary>> {
        Ok(self.list_all()?.iter().map(Movie::summary).collect())
    }

    /// every movie whose genre equals `genre` exactly, ordered by key
    fn list_by_genre(&self, genre: &str) -> Result<Vec<Movie>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|movie| movie.genre == genre)
            .collect())
    }
}

/// The engines a server can be started with
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineKind {
    /// [`LogCatalog`]
    Log,
    /// [`SledCatalog`]
    Sled,
    /// [`MemoryCatalog`]
    Memory,
}

impl EngineKind {
    /// names accepted on the command line and in the engine marker file
    pub const VARIANTS: [&'static str; 3] = ["log", "sled", "memory"];
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::Log => "log",
            EngineKind::Sled => "sled",
            EngineKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl FromStr for EngineKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "log" => Ok(EngineKind::Log),
            "sled" => Ok(EngineKind::Sled),
            "memory" => Ok(EngineKind::Memory),
            other => Err(CatalogError::Parsing(format!(
                "unknown engine '{}', expected one of {:?}",
                other,
                EngineKind::VARIANTS
            ))),
        }
    }
}

mod log;
mod memory;
mod sled;

pub use self::log::LogCatalog;
pub use self::memory::MemoryCatalog;
pub use self::sled::SledCatalog;
