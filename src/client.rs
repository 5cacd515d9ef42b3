use std::net::{TcpStream, ToSocketAddrs};

use tracing::debug;

use crate::command::{ProtocolError, Reply, Request};
use crate::frame::{FrameError, FrameReader, FrameWriter, DEFAULT_MAX_FRAME};
use crate::movie::Key;
use crate::{CatalogError, Result};

/// `CatalogClient` contains the functionality for talking to a [`CatalogServer`](crate::CatalogServer)
pub struct CatalogClient {
    reader: FrameReader<TcpStream>,
    writer: FrameWriter<TcpStream>,
}

impl CatalogClient {
    /// creates a client and establishes a socket connection to the server at the given `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::connect_with_max_frame(addr, DEFAULT_MAX_FRAME)
    }

    /// same as [`CatalogClient::connect`], accepting reply lines of up to `max_frame` bytes
    pub fn connect_with_max_frame<A: ToSocketAddrs>(addr: A, max_frame: usize) -> Result<Self> {
        let tcp_reader = TcpStream::connect(addr)?;
        let tcp_writer = tcp_reader.try_clone()?;

        Ok(CatalogClient {
            reader: FrameReader::new(tcp_reader, max_frame),
            writer: FrameWriter::new(tcp_writer),
        })
    }

    /// sends a create request; the server derives the new movie's key
    pub fn create(&mut self, title: &str, genre: &str, director: &str, year: &str) -> Result<Reply> {
        self.send(&Request::Create {
            title: title.to_string(),
            genre: genre.to_string(),
            director: director.to_string(),
            year: year.to_string(),
        })
    }

    /// changes the genre of the movie stored under `key`
    pub fn update_genre(&mut self, key: Key, genre: &str) -> Result<Reply> {
        self.send(&Request::UpdateGenre {
            key,
            genre: genre.to_string(),
        })
    }

    /// removes the movie stored under `key`
    pub fn delete(&mut self, key: Key) -> Result<Reply> {
        self.send(&Request::Delete { key })
    }

    /// fetches the movie stored under `key`
    pub fn get(&mut self, key: Key) -> Result<Reply> {
        self.send(&Request::Get { key })
    }

    /// lists the key and title of every movie
    pub fn list_summaries(&mut self) -> Result<Reply> {
        self.send(&Request::ListSummaries)
    }

    /// lists every movie with all of its fields
    pub fn list_all(&mut self) -> Result<Reply> {
        self.send(&Request::ListAll)
    }

    /// lists the movies of one genre
    pub fn list_by_genre(&mut self, genre: &str) -> Result<Reply> {
        self.send(&Request::ListByGenre {
            genre: genre.to_string(),
        })
    }

    /// encodes and sends `request`, then waits for its reply
    ///
    /// # Errors
    /// [`CatalogError::Protocol`] if an operand cannot be carried by the protocol; nothing is
    /// sent in that case
    pub fn send(&mut self, request: &Request) -> Result<Reply> {
        let line = request.encode()?;
        self.send_line(&line)
    }

    /// Sends a raw request line and waits for the reply.
    ///
    /// The server answers malformed lines with an `ERROR` reply.
    pub fn send_line(&mut self, line: &str) -> Result<Reply> {
        self.writer.write_frame(line.as_bytes())?;
        debug!("sent {:?}", line);

        let frame = self.reader.read_frame().map_err(|e| match e {
            FrameError::Io(e) => CatalogError::Io(e),
            too_long => CatalogError::StringErr(format!("reply rejected: {}", too_long)),
        })?;
        let frame = frame.ok_or_else(|| {
            CatalogError::StringErr("the server closed the connection prematurely".to_string())
        })?;
        let text = String::from_utf8(frame).map_err(|_| ProtocolError::NotUtf8)?;
        Ok(Reply::parse(&text)?)
    }
}
