use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{CatalogEngine, Insert};
use crate::movie::{Key, Movie};
use crate::Result;

/// A volatile catalog kept in a [`DashMap`]. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    movies: Arc<DashMap<Key, Movie>>,
}

impl MemoryCatalog {
    /// creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogEngine for MemoryCatalog {
    fn insert(&self, movie: Movie) -> Result<Insert> {
        // the entry holds the shard lock, so check and insert cannot interleave
        match self.movies.entry(movie.key) {
            Entry::Occupied(_) => Ok(Insert::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(movie);
                Ok(Insert::Inserted)
            }
        }
    }

    fn update_genre(&self, key: Key, genre: &str) -> Result<bool> {
        match self.movies.get_mut(&key) {
            Some(mut movie) => {
                movie.genre = genre.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, key: Key) -> Result<bool> {
        Ok(self.movies.remove(&key).is_some())
    }

    fn get(&self, key: Key) -> Result<Option<Movie>> {
        Ok(self.movies.get(&key).map(|movie| movie.value().clone()))
    }

    fn list_all(&self) -> Result<Vec<Movie>> {
        let mut movies: Vec<Movie> = self.movies.iter().map(|entry| entry.value().clone()).collect();
        movies.sort_by_key(|movie| movie.key);
        Ok(movies)
    }
}
