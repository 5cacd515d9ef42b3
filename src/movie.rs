use serde::{Deserialize, Serialize};
use std::fmt;

/// The derived integer identity of a movie. See [`KeyScheme`](crate::KeyScheme).
pub type Key = i64;

/// A movie record as it is kept in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// derived from the four other fields, never supplied by a client
    pub key: Key,
    /// the movie title
    pub title: String,
    /// the genre, matched exactly by "list by genre"
    pub genre: String,
    /// the director
    pub director: String,
    /// release year, kept as text
    pub year: String,
}

impl Movie {
    /// builds a movie with an already derived `key`
    pub fn new(
        key: Key,
        title: impl Into<String>,
        genre: impl Into<String>,
        director: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Movie {
            key,
            title: title.into(),
            genre: genre.into(),
            director: director.into(),
            year: year.into(),
        }
    }

    /// the (key, title) pair shown by the summary listing
    pub fn summary(&self) -> Summary {
        Summary {
            key: self.key,
            title: self.title.clone(),
        }
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | Title: {} | Genre: {} | Director: {} | Year: {}",
            self.key, self.title, self.genre, self.director, self.year
        )
    }
}

/// The short form of a [`Movie`] returned by the summary listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// the movie's key
    pub key: Key,
    /// the movie's title
    pub title: String,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID: {} | Title: {}", self.key, self.title)
    }
}
