use std::path::Path;

use sled::Db;
use tracing::{debug, instrument};

use super::{CatalogEngine, Insert};
use crate::movie::{Key, Movie};
use crate::Result;

/// A catalog engine backed by the [`sled`] embedded database.
///
/// Movies are stored as JSON under the big-endian bytes of their key. Inserts are a single
/// compare-and-swap against an absent value, so the uniqueness check happens inside sled.
///
/// [`sled`]: https://docs.rs/sled/latest/sled/
#[derive(Debug, Clone)]
pub struct SledCatalog {
    db: Db,
}

impl SledCatalog {
    /// wraps an already opened sled database
    pub fn new(db: Db) -> Self {
        SledCatalog { db }
    }

    /// opens (or creates) a sled database in `dir`
    #[instrument]
    pub fn open(dir: &Path) -> Result<Self> {
        let db = sled::open(dir)?;
        debug!(movies = db.len(), "opened sled catalog");
        Ok(SledCatalog::new(db))
    }
}

fn key_bytes(key: Key) -> [u8; 8] {
    key.to_be_bytes()
}

impl CatalogEngine for SledCatalog {
    fn insert(&self, movie: Movie) -> Result<Insert> {
        let value = serde_json::to_vec(&movie)?;
        let swapped = self
            .db
            .compare_and_swap(key_bytes(movie.key), None as Option<&[u8]>, Some(value))?;
        match swapped {
            Ok(()) => {
                self.db.flush()?;
                Ok(Insert::Inserted)
            }
            Err(_) => Ok(Insert::Duplicate),
        }
    }

    fn update_genre(&self, key: Key, genre: &str) -> Result<bool> {
        let id = key_bytes(key);
        loop {
            let current = match self.db.get(id)? {
                Some(current) => current,
                None => return Ok(false),
            };
            let mut movie: Movie = serde_json::from_slice(&current)?;
            movie.genre = genre.to_string();
            let updated = serde_json::to_vec(&movie)?;

            // retry if another connection changed the movie since it was read
            if self
                .db
                .compare_and_swap(id, Some(&current), Some(updated))?
                .is_ok()
            {
                self.db.flush()?;
                return Ok(true);
            }
            debug!(key, "genre update raced with another writer, retrying");
        }
    }

    fn delete(&self, key: Key) -> Result<bool> {
        let removed = self.db.remove(key_bytes(key))?.is_some();
        if removed {
            self.db.flush()?;
        }
        Ok(removed)
    }

    fn get(&self, key: Key) -> Result<Option<Movie>> {
        match self.db.get(key_bytes(key))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn list_all(&self) -> Result<Vec<Movie>> {
        let mut movies = self
            .db
            .iter()
            .values()
            .map(|value| -> Result<Movie> { Ok(serde_json::from_slice(&value?)?) })
            .collect::<Result<Vec<Movie>>>()?;
        // big-endian bytes do not order negative keys before positive ones
        movies.sort_by_key(|movie| movie.key);
        Ok(movies)
    }
}
