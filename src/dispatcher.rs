//! Execution of parsed requests against a catalog engine.
use tracing::{debug, error};

use crate::command::{Request, Response};
use crate::engine::{CatalogEngine, Insert};
use crate::identity::{KeyScheme, PrimeSum};
use crate::movie::Movie;
use crate::CatalogError;

/// Turns request lines into engine calls and engine results into [`Response`]s.
///
/// Every request maps to exactly one engine call, so whatever atomicity the engine gives that
/// call is the atomicity of the request. The dispatcher holds no lock of its own and never
/// touches the network.
#[derive(Debug, Clone)]
pub struct Dispatcher<E: CatalogEngine, K: KeyScheme = PrimeSum> {
    engine: E,
    scheme: K,
}

impl<E: CatalogEngine> Dispatcher<E, PrimeSum> {
    /// a dispatcher over `engine` using the default key scheme
    pub fn new(engine: E) -> Self {
        Dispatcher::with_scheme(engine, PrimeSum)
    }
}

impl<E: CatalogEngine, K: KeyScheme> Dispatcher<E, K> {
    /// a dispatcher over `engine` deriving keys with `scheme`
    pub fn with_scheme(engine: E, scheme: K) -> Self {
        Dispatcher { engine, scheme }
    }

    /// the engine requests are executed against
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// parses `line` and executes it
    pub fn handle(&self, line: &str) -> Response {
        match Request::parse(line) {
            Ok(request) => self.execute(request),
            Err(e) => {
                debug!("rejected request {:?}: {}", line, e);
                Response::Protocol(e)
            }
        }
    }

    /// executes an already parsed request
    pub fn execute(&self, request: Request) -> Response {
        match request {
            Request::Create {
                title,
                genre,
                director,
                year,
            } => {
                let key = self.scheme.derive_key(&title, &genre, &director, &year);
                let movie = Movie {
                    key,
                    title,
                    genre,
                    director,
                    year,
                };
                match self.engine.insert(movie) {
                    Ok(Insert::Inserted) => Response::Created(key),
                    Ok(Insert::Duplicate) => Response::Duplicate(key),
                    Err(e) => failure("create", e),
                }
            }
            Request::UpdateGenre { key, genre } => match self.engine.update_genre(key, &genre) {
                Ok(true) => Response::Updated(key),
                Ok(false) => Response::KeyNotFound(key),
                Err(e) => failure("update genre", e),
            },
            Request::Delete { key } => match self.engine.delete(key) {
                Ok(true) => Response::Deleted(key),
                Ok(false) => Response::KeyNotFound(key),
                Err(e) => failure("delete", e),
            },
            Request::ListSummaries => match self.engine.list_summaries() {
                Ok(summaries) => Response::Summaries(summaries),
                Err(e) => failure("list summaries", e),
            },
            Request::ListAll => match self.engine.list_all() {
                Ok(movies) => Response::Movies(movies),
                Err(e) => failure("list all", e),
            },
            Request::Get { key } => match self.engine.get(key) {
                Ok(Some(movie)) => Response::Movie(movie),
                Ok(None) => Response::KeyNotFound(key),
                Err(e) => failure("get", e),
            },
            Request::ListByGenre { genre } => match self.engine.list_by_genre(&genre) {
                Ok(movies) if movies.is_empty() => Response::GenreNotFound(genre),
                Ok(movies) => Response::Movies(movies),
                Err(e) => failure("list by genre", e),
            },
        }
    }
}

fn failure(operation: &str, e: CatalogError) -> Response {
    error!("{} failed: {}", operation, e);
    Response::Failure(format!("{} failed: {}", operation, e))
}
