//! Newline delimited framing over a byte stream.
//!
//! A frame is every byte up to a `\n` delimiter. The delimiter, and a `\r` right before it,
//! are stripped from the frames handed back by [`FrameReader::read_frame`].
//!
//! Frames are bounded by a maximum line length that includes the delimiter. A line that
//! grows past the bound is consumed up to its delimiter and discarded, and the reader
//! reports [`FrameError::TooLong`]. Oversized lines are never truncated and passed on, so
//! the stream stays aligned on frame boundaries and the peer gets one error per bad line.
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use thiserror::Error;

/// the frame delimiter
pub const DELIMITER: u8 = b'\n';

/// default bound on a line, delimiter included
pub const DEFAULT_MAX_FRAME: usize = 1024;

/// Errors returned while reading a frame
#[derive(Error, Debug)]
pub enum FrameError {
    /// the line was longer than the reader's bound and has been discarded
    #[error("request exceeds {limit} bytes")]
    TooLong {
        /// the bound that was exceeded
        limit: usize,
    },
    /// the underlying stream failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Reads delimited frames from `R`.
///
/// Interrupted reads are retried transparently.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
    max_frame: usize,
}

impl<R: Read> FrameReader<R> {
    /// wraps `inner`, accepting lines of at most `max_frame` bytes (delimiter included)
    pub fn new(inner: R, max_frame: usize) -> Self {
        FrameReader {
            reader: BufReader::new(inner),
            max_frame: max_frame.max(1),
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the stream ends before any byte of a new frame was read.
    /// If the stream ends part way through a line, the bytes read so far are returned
    /// as the final frame.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let mut frame = Vec::new();
        let mut seen_any = false;
        let mut oversized = false;

        loop {
            let (found, used) = {
                let available = match self.reader.fill_buf() {
                    Ok(buf) => buf,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                if available.is_empty() {
                    // end of stream
                    if oversized {
                        return Err(FrameError::TooLong { limit: self.max_frame });
                    }
                    if !seen_any {
                        return Ok(None);
                    }
                    break;
                }
                seen_any = true;
                match available.iter().position(|&b| b == DELIMITER) {
                    Some(i) => {
                        if !oversized {
                            frame.extend_from_slice(&available[..i]);
                        }
                        (true, i + 1)
                    }
                    None => {
                        if !oversized {
                            frame.extend_from_slice(available);
                        }
                        (false, available.len())
                    }
                }
            };
            self.reader.consume(used);

            // the delimiter takes up one byte of the bound
            if frame.len() >= self.max_frame {
                oversized = true;
                frame.clear();
            }
            if found {
                break;
            }
        }

        if oversized {
            return Err(FrameError::TooLong { limit: self.max_frame });
        }
        if frame.last() == Some(&b'\r') {
            frame.pop();
        }
        Ok(Some(frame))
    }

    /// a reference to the wrapped stream
    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }
}

/// Writes delimited frames to `W`, guaranteeing every byte reaches the stream.
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    /// wraps `inner`
    pub fn new(inner: W) -> Self {
        FrameWriter { writer: inner }
    }

    /// Writes `payload` followed by the delimiter, then flushes.
    ///
    /// Partial writes and interrupted writes are retried. A write that accepts zero bytes
    /// fails with [`ErrorKind::WriteZero`].
    ///
    /// # Errors
    /// [`ErrorKind::InvalidInput`] if `payload` contains the delimiter, since the peer would
    /// read it as two frames.
    pub fn write_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        if payload.contains(&DELIMITER) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "frame payload contains the frame delimiter",
            ));
        }
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(DELIMITER);

        let mut remaining = &line[..];
        while !remaining.is_empty() {
            match self.writer.write(remaining) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "stream accepted no bytes of the frame",
                    ))
                }
                Ok(n) => remaining = &remaining[n..],
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        loop {
            match self.writer.flush() {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    /// a reference to the wrapped stream
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}
