//! The catalog's request/response line protocol.
//!
//! A request is `<opcode>['|' operand]*`, e.g. `1|Dune|Sci-Fi|Denis Villeneuve|2021`.
//! Operands cannot contain `|`, there is no escaping.
//!
//! A response is a status token, a space and a human readable message. Listings put each
//! row after the message, separated by [`ROW_SEPARATOR`], so a whole listing stays in one
//! frame.
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::movie::{Key, Movie, Summary};

/// separates the fields of a request
pub const FIELD_DELIMITER: char = '|';

/// separates the rows of a listing inside one response frame (ASCII record separator)
pub const ROW_SEPARATOR: char = '\u{1e}';

/// Errors in the shape of a request or reply. These are answered on the connection and
/// never end a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// the request line was empty
    #[error("empty request")]
    Empty,
    /// the opcode is not one of 1-7
    #[error("unknown operation '{0}'")]
    UnknownOpcode(String),
    /// wrong number of operands for the opcode
    #[error("operation {opcode} takes {expected} operand(s), got {actual}")]
    Arity {
        /// the opcode of the request
        opcode: u8,
        /// operands the opcode needs
        expected: usize,
        /// operands that were sent
        actual: usize,
    },
    /// an id operand is not an integer
    #[error("invalid id '{0}'")]
    InvalidId(String),
    /// a text operand was empty
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    /// an operand holds a character the protocol cannot carry
    #[error("{0} contains a reserved character ('|' or a line break)")]
    ReservedCharacter(&'static str),
    /// the request line was longer than the frame bound
    #[error("request exceeds {limit} bytes")]
    FrameTooLong {
        /// the frame bound
        limit: usize,
    },
    /// the request line is not UTF-8
    #[error("request is not valid UTF-8")]
    NotUtf8,
    /// a reply line did not start with a known status token
    #[error("malformed reply '{0}'")]
    MalformedReply(String),
}

/// The requests a client can send, one per opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `1|title|genre|director|year`
    Create {
        /// movie title
        title: String,
        /// movie genre
        genre: String,
        /// movie director
        director: String,
        /// release year
        year: String,
    },
    /// `2|id|genre`
    UpdateGenre {
        /// key of the movie to change
        key: Key,
        /// the new genre
        genre: String,
    },
    /// `3|id`
    Delete {
        /// key of the movie to remove
        key: Key,
    },
    /// `4`
    ListSummaries,
    /// `5`
    ListAll,
    /// `6|id`
    Get {
        /// key of the movie to fetch
        key: Key,
    },
    /// `7|genre`
    ListByGenre {
        /// the genre to match exactly
        genre: String,
    },
}

impl Request {
    /// the opcode digit of this request
    pub fn opcode(&self) -> u8 {
        match self {
            Request::Create { .. } => 1,
            Request::UpdateGenre { .. } => 2,
            Request::Delete { .. } => 3,
            Request::ListSummaries => 4,
            Request::ListAll => 5,
            Request::Get { .. } => 6,
            Request::ListByGenre { .. } => 7,
        }
    }

    /// Parses one request line (without its delimiter).
    ///
    /// The operand count must match the opcode's arity exactly.
    pub fn parse(line: &str) -> Result<Request, ProtocolError> {
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let mut fields = line.split(FIELD_DELIMITER);
        let code = fields.next().unwrap_or_default();
        let operands: Vec<&str> = fields.collect();

        let opcode = match code {
            "1" | "2" | "3" | "4" | "5" | "6" | "7" => code.as_bytes()[0] - b'0',
            _ => return Err(ProtocolError::UnknownOpcode(code.to_string())),
        };
        let expected = match opcode {
            1 => 4,
            2 => 2,
            3 | 6 | 7 => 1,
            _ => 0,
        };
        if operands.len() != expected {
            return Err(ProtocolError::Arity {
                opcode,
                expected,
                actual: operands.len(),
            });
        }

        let request = match opcode {
            1 => Request::Create {
                title: text(operands[0], "title")?,
                genre: text(operands[1], "genre")?,
                director: text(operands[2], "director")?,
                year: text(operands[3], "year")?,
            },
            2 => Request::UpdateGenre {
                key: parse_key(operands[0])?,
                genre: text(operands[1], "genre")?,
            },
            3 => Request::Delete {
                key: parse_key(operands[0])?,
            },
            4 => Request::ListSummaries,
            5 => Request::ListAll,
            6 => Request::Get {
                key: parse_key(operands[0])?,
            },
            _ => Request::ListByGenre {
                genre: text(operands[0], "genre")?,
            },
        };
        Ok(request)
    }

    /// Encodes this request as a line (without its delimiter).
    ///
    /// # Errors
    /// returns [`ProtocolError::ReservedCharacter`] if an operand holds `|` or a line break,
    /// and [`ProtocolError::EmptyField`] for an empty text operand
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let operands = match self {
            Request::Create {
                title,
                genre,
                director,
                year,
            } => vec![
                checked(title, "title")?,
                checked(genre, "genre")?,
                checked(director, "director")?,
                checked(year, "year")?,
            ],
            Request::UpdateGenre { key, genre } => vec![key.to_string(), checked(genre, "genre")?],
            Request::Delete { key } | Request::Get { key } => vec![key.to_string()],
            Request::ListSummaries | Request::ListAll => vec![],
            Request::ListByGenre { genre } => vec![checked(genre, "genre")?],
        };

        let mut line = self.opcode().to_string();
        for operand in operands {
            line.push(FIELD_DELIMITER);
            line.push_str(&operand);
        }
        Ok(line)
    }
}

fn text(operand: &str, name: &'static str) -> Result<String, ProtocolError> {
    if operand.is_empty() {
        Err(ProtocolError::EmptyField(name))
    } else {
        Ok(operand.to_string())
    }
}

fn checked(operand: &str, name: &'static str) -> Result<String, ProtocolError> {
    if operand.contains(|c: char| c == FIELD_DELIMITER || c == '\n' || c == '\r') {
        return Err(ProtocolError::ReservedCharacter(name));
    }
    text(operand, name)
}

fn parse_key(operand: &str) -> Result<Key, ProtocolError> {
    operand
        .parse::<Key>()
        .map_err(|_| ProtocolError::InvalidId(operand.to_string()))
}

/// The leading token of every response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// the request succeeded
    Ok,
    /// a create found the record already in the catalog
    Duplicate,
    /// the id or genre matched nothing
    NotFound,
    /// the store failed, or the response would not fit in a frame
    Fail,
    /// the request was malformed
    Error,
}

impl Status {
    /// the wire token
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Duplicate => "DUPLICATE",
            Status::NotFound => "NOT_FOUND",
            Status::Fail => "FAIL",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Status::Ok),
            "DUPLICATE" => Ok(Status::Duplicate),
            "NOT_FOUND" => Ok(Status::NotFound),
            "FAIL" => Ok(Status::Fail),
            "ERROR" => Ok(Status::Error),
            other => Err(ProtocolError::MalformedReply(other.to_string())),
        }
    }
}

/// The outcome of one request. Text is only produced by [`Response::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// a new movie was stored under this key
    Created(Key),
    /// the genre of this key was changed
    Updated(Key),
    /// this key was removed
    Deleted(Key),
    /// a single movie
    Movie(Movie),
    /// the summary listing
    Summaries(Vec<Summary>),
    /// a full listing
    Movies(Vec<Movie>),
    /// the create would have duplicated the movie stored under this key
    Duplicate(Key),
    /// no movie has this key
    KeyNotFound(Key),
    /// no movie has this genre
    GenreNotFound(String),
    /// the store failed
    Failure(String),
    /// the request was malformed
    Protocol(ProtocolError),
}

impl Response {
    /// the status token this response is sent with
    pub fn status(&self) -> Status {
        match self {
            Response::Created(_)
            | Response::Updated(_)
            | Response::Deleted(_)
            | Response::Movie(_)
            | Response::Summaries(_)
            | Response::Movies(_) => Status::Ok,
            Response::Duplicate(_) => Status::Duplicate,
            Response::KeyNotFound(_) | Response::GenreNotFound(_) => Status::NotFound,
            Response::Failure(_) => Status::Fail,
            Response::Protocol(_) => Status::Error,
        }
    }

    /// Encodes the response as one line (without its delimiter).
    ///
    /// Line breaks and row separators found inside stored fields are replaced by spaces,
    /// so the result never contains the frame delimiter.
    pub fn encode(&self) -> String {
        let (message, rows): (String, Vec<String>) = match self {
            Response::Created(key) => (format!("created {}", key), vec![]),
            Response::Updated(key) => (format!("updated {}", key), vec![]),
            Response::Deleted(key) => (format!("deleted {}", key), vec![]),
            Response::Movie(movie) => (movie.to_string(), vec![]),
            Response::Summaries(rows) => listing(rows),
            Response::Movies(rows) => listing(rows),
            Response::Duplicate(key) => (format!("record already exists with id {}", key), vec![]),
            Response::KeyNotFound(key) => (format!("no movie with id {}", key), vec![]),
            Response::GenreNotFound(genre) => (format!("no movies with genre \"{}\"", genre), vec![]),
            Response::Failure(reason) => (reason.clone(), vec![]),
            Response::Protocol(e) => (e.to_string(), vec![]),
        };

        let mut line = format!("{} {}", self.status(), sanitize(&message));
        for row in rows {
            line.push(ROW_SEPARATOR);
            line.push_str(&sanitize(&row));
        }
        line
    }
}

fn listing<T: fmt::Display>(rows: &[T]) -> (String, Vec<String>) {
    if rows.is_empty() {
        return ("catalog is empty".to_string(), vec![]);
    }
    let message = format!("{} record(s)", rows.len());
    (message, rows.iter().map(|row| row.to_string()).collect())
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' | '\r' | ROW_SEPARATOR => ' ',
            c => c,
        })
        .collect()
}

/// A response line as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// the leading status token
    pub status: Status,
    /// the text after the status token
    pub message: String,
    /// rows of a listing, empty for every other response
    pub rows: Vec<String>,
}

impl Reply {
    /// parses a response line (without its delimiter)
    pub fn parse(line: &str) -> Result<Reply, ProtocolError> {
        let mut parts = line.split(ROW_SEPARATOR);
        let head = parts.next().unwrap_or_default();
        let (token, message) = match head.find(' ') {
            Some(i) => (&head[..i], &head[i + 1..]),
            None => (head, ""),
        };
        let status = token
            .parse::<Status>()
            .map_err(|_| ProtocolError::MalformedReply(line.to_string()))?;

        Ok(Reply {
            status,
            message: message.to_string(),
            rows: parts.map(String::from).collect(),
        })
    }

    /// true for an `OK` reply
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)?;
        for row in &self.rows {
            write!(f, "\n{}", row)?;
        }
        Ok(())
    }
}
